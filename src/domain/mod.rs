pub mod chat;
pub mod order;
pub mod progress;
pub mod user;

pub use chat::*;
pub use order::*;
pub use progress::{ProgressError, ProgressStage, StageTag, SYSTEM_COMPLETER};
pub use user::*;
