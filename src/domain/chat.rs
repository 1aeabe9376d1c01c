use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatParticipant {
    pub email: String,
    pub role: Role,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender_email: String,
    pub sender_role: Role,
    pub sender_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-order message transcript, keyed by the order id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub order_id: String,
    pub participants: Vec<ChatParticipant>,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatRoom {
    pub fn participant(&self, email: &str) -> Option<&ChatParticipant> {
        self.participants.iter().find(|p| p.email == email)
    }
}

#[derive(Debug, Clone)]
pub struct ChatRoomCreate {
    pub order_id: String,
    pub participants: Vec<ChatParticipant>,
}

/// Swaps out the participant holding `participant.role`, appending when the role is vacant.
#[derive(Debug, Clone, Default)]
pub struct ChatRoomPatch {
    pub replace_participant: Option<ChatParticipant>,
}

/// A message as submitted, before the room stamps it.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_email: String,
    pub sender_role: Role,
    pub sender_name: String,
    pub text: String,
}
