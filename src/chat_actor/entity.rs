use chrono::Utc;

use super::actions::ChatAction;
use super::error::ChatError;
use crate::actor_framework::Entity;
use crate::domain::{ChatMessage, ChatRoom, ChatRoomCreate, ChatRoomPatch};

impl Entity for ChatRoom {
    const KIND: &'static str = "chat_room";

    type Id = String;
    type CreateParams = ChatRoomCreate;
    type Patch = ChatRoomPatch;
    type Action = ChatAction;
    type ActionResult = ChatMessage;
    type DeleteGuard = ();
    type Error = ChatError;

    fn id(&self) -> String {
        self.order_id.clone()
    }

    fn from_create_params(order_id: String, params: ChatRoomCreate) -> Result<Self, ChatError> {
        let now = Utc::now();
        Ok(Self {
            order_id,
            participants: params.participants,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    fn on_update(&mut self, patch: ChatRoomPatch) -> Result<(), ChatError> {
        if let Some(incoming) = patch.replace_participant {
            match self.participants.iter_mut().find(|p| p.role == incoming.role) {
                Some(slot) if *slot == incoming => return Ok(()),
                Some(slot) => *slot = incoming,
                None => self.participants.push(incoming),
            }
            self.updated_at = Utc::now();
        }
        Ok(())
    }

    fn handle_action(&mut self, action: ChatAction) -> Result<ChatMessage, ChatError> {
        match action {
            ChatAction::PostMessage(message) => {
                if self.participant(&message.sender_email).is_none() {
                    return Err(ChatError::NotParticipant(message.sender_email));
                }
                let text = message.text.trim();
                if text.is_empty() {
                    return Err(ChatError::EmptyMessage);
                }

                let now = Utc::now();
                let posted = ChatMessage {
                    sender_email: message.sender_email,
                    sender_role: message.sender_role,
                    sender_name: message.sender_name,
                    text: text.to_string(),
                    timestamp: now,
                };
                self.messages.push(posted.clone());
                self.updated_at = now;
                Ok(posted)
            }
        }
    }
}
