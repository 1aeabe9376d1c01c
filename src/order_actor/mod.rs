//! Order-specific domain logic: creation, detail edits, approvals and deletion rules.

pub mod entity;
pub mod error;

pub use entity::*;
pub use error::*;
