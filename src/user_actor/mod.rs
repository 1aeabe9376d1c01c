//! User directory entries keyed by (email, role).

pub mod entity;
pub mod error;

pub use error::*;
