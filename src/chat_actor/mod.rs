//! Per-order chat transcripts and the participant check on posting.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
