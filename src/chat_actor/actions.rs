use crate::domain::NewMessage;

/// Custom actions for ChatRoom entities.
#[derive(Debug, Clone)]
pub enum ChatAction {
    /// Appends a message from a participant.
    ///
    /// # Errors
    /// Fails if the sender is not a participant or the text is blank.
    PostMessage(NewMessage),
}
