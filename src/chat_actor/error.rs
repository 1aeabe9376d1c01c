use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChatError {
    #[error("Chat room not found: {0}")]
    NotFound(String),
    #[error("Chat room already exists: {0}")]
    AlreadyExists(String),
    #[error("{0} is not a participant in this chat room")]
    NotParticipant(String),
    #[error("Message text is empty")]
    EmptyMessage,
    #[error("Chat storage error: {0}")]
    StorageError(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

crate::impl_from_framework_error!(ChatError);
