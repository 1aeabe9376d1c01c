use thiserror::Error;

/// Errors that can occur during user operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),
    #[error("User already exists: {0}")]
    AlreadyExists(String),
    #[error("User validation error: {0}")]
    ValidationError(String),
    #[error("User storage error: {0}")]
    StorageError(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

crate::impl_from_framework_error!(UserError);
