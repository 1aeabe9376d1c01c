use thiserror::Error;

use crate::domain::ProgressError;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Order id already taken: {0}")]
    AlreadyExists(String),
    #[error("Not authorized: {0}")]
    NotAuthorized(String),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error("Order validation error: {0}")]
    ValidationError(String),
    #[error("Chat room error: {0}")]
    ChatRoom(String),
    #[error("User lookup failed: {0}")]
    UserLookup(String),
    #[error("Order storage error: {0}")]
    StorageError(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

crate::impl_from_framework_error!(OrderError);
