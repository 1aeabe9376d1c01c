use tracing::{debug, info, instrument};

use crate::actor_framework::ResourceClient;
use crate::chat_actor::{ChatAction, ChatError};
use crate::domain::{ChatMessage, ChatParticipant, ChatRoom, ChatRoomCreate, ChatRoomPatch, NewMessage};

/// Client for interacting with the ChatRoom actor.
#[derive(Clone)]
pub struct ChatClient {
    inner: ResourceClient<ChatRoom>,
}

crate::impl_basic_client!(ChatClient, ChatRoom, ChatError, chat_room);

impl ChatClient {
    #[instrument(skip(self, participants))]
    pub async fn create_room(
        &self,
        order_id: String,
        participants: Vec<ChatParticipant>,
    ) -> Result<ChatRoom, ChatError> {
        debug!(participants = participants.len(), "Sending request");
        let room = self.inner.create(ChatRoomCreate { order_id, participants }).await?;
        info!("Chat room created");
        Ok(room)
    }

    #[instrument(skip(self))]
    pub async fn messages(&self, order_id: String) -> Result<Vec<ChatMessage>, ChatError> {
        self.get_chat_room(order_id.clone())
            .await?
            .map(|room| room.messages)
            .ok_or(ChatError::NotFound(order_id))
    }

    #[instrument(skip(self, message), fields(sender = %message.sender_email))]
    pub async fn post_message(&self, order_id: String, message: NewMessage) -> Result<ChatMessage, ChatError> {
        debug!("Sending request");
        Ok(self.inner.perform_action(order_id, ChatAction::PostMessage(message)).await?)
    }

    /// Hands `participant.role`'s seat in the room to `participant`.
    #[instrument(skip(self, participant), fields(email = %participant.email, role = %participant.role))]
    pub async fn replace_participant(
        &self,
        order_id: String,
        participant: ChatParticipant,
    ) -> Result<ChatRoom, ChatError> {
        debug!("Sending request");
        let patch = ChatRoomPatch { replace_participant: Some(participant) };
        let room = self.inner.update(order_id, patch).await?;
        info!("Chat participant replaced");
        Ok(room)
    }

    #[instrument(skip(self))]
    pub async fn delete_room(&self, order_id: String) -> Result<(), ChatError> {
        debug!("Sending request");
        Ok(self.inner.delete(order_id, ()).await?)
    }
}
