//! System orchestration, startup, and shutdown logic.

pub mod deposit_system;
pub mod telemetry;
pub mod watcher;

pub use deposit_system::*;
pub use telemetry::*;
pub use watcher::*;
