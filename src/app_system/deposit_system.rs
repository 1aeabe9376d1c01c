use tracing::{error, info};
use uuid::Uuid;

use crate::actor_framework::ResourceActor;
use crate::clients::{ChatClient, OrderClient, UserClient};
use crate::config::Config;
use crate::domain::{ChatRoom, ChatRoomCreate, Order, OrderCreate, User, UserCreate, UserKey};
use crate::persistence::memory::MemoryStore;
use crate::persistence::{open_store, StorageError, Store};

pub const ORDERS_FILE: &str = "orders.json";
pub const USERS_FILE: &str = "users.json";
pub const CHAT_ROOMS_FILE: &str = "chat_rooms.json";

/// Six decimal digits, never starting with zero.
pub fn generate_order_id() -> String {
    let n = 100_000 + Uuid::new_v4().as_u128() % 900_000;
    n.to_string()
}

/// The main application system that orchestrates all actors.
///
/// Responsible for starting up actors, wiring them together, and handling shutdown.
pub struct DepositSystem {
    pub order_client: OrderClient,
    pub user_client: UserClient,
    pub chat_client: ChatClient,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl DepositSystem {
    /// Opens the configured stores and spawns the user, chat and order actors.
    pub fn start(config: &Config) -> Result<Self, StorageError> {
        info!(storage = ?config.storage, buffer_size = config.buffer_size, "Starting deposit system");
        Ok(Self::spawn(
            config.buffer_size,
            open_store(&config.storage, USERS_FILE)?,
            open_store(&config.storage, CHAT_ROOMS_FILE)?,
            open_store(&config.storage, ORDERS_FILE)?,
        ))
    }

    /// In-memory system; everything is lost on shutdown.
    pub fn in_memory(buffer_size: usize) -> Self {
        info!(buffer_size, "Starting in-memory deposit system");
        Self::spawn(
            buffer_size,
            Box::new(MemoryStore::<User>::new()),
            Box::new(MemoryStore::<ChatRoom>::new()),
            Box::new(MemoryStore::<Order>::new()),
        )
    }

    fn spawn(
        buffer_size: usize,
        user_store: Box<dyn Store<User>>,
        chat_store: Box<dyn Store<ChatRoom>>,
        order_store: Box<dyn Store<Order>>,
    ) -> Self {
        // 1. Setup User Service, keyed by (email, role)
        let (user_actor, user_resource_client) =
            ResourceActor::<User>::new(buffer_size, user_store, |params: &UserCreate| {
                UserKey::new(params.email.trim(), params.role)
            });
        let user_client = UserClient::new(user_resource_client);
        let user_handle = tokio::spawn(user_actor.run());

        // 2. Setup Chat Service, one room per order
        let (chat_actor, chat_resource_client) =
            ResourceActor::<ChatRoom>::new(buffer_size, chat_store, |params: &ChatRoomCreate| {
                params.order_id.clone()
            });
        let chat_client = ChatClient::new(chat_resource_client);
        let chat_handle = tokio::spawn(chat_actor.run());

        // 3. Setup Order Service, which coordinates the other two
        let (order_actor, order_resource_client) =
            ResourceActor::<Order>::new(buffer_size, order_store, |_: &OrderCreate| generate_order_id());
        let order_client = OrderClient::new(order_resource_client, user_client.clone(), chat_client.clone());
        let order_handle = tokio::spawn(order_actor.run());

        Self {
            order_client,
            user_client,
            chat_client,
            handles: vec![user_handle, chat_handle, order_handle],
        }
    }

    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");
        // Dropping the clients closes the channels; each actor exits once its
        // receiver drains. Watchers holding an OrderClient keep the order actor alive.
        drop(self.order_client);
        drop(self.user_client);
        drop(self.chat_client);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(format!("Actor task failed: {:?}", e));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_ids_are_six_digits() {
        for _ in 0..200 {
            let id = generate_order_id();
            assert_eq!(id.len(), 6, "{id}");
            assert!(id.chars().all(|c| c.is_ascii_digit()));
            assert!(!id.starts_with('0'));
        }
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let system = DepositSystem::in_memory(4);
        assert!(system.user_client.list_users().await.unwrap().is_empty());
        system.shutdown().await.unwrap();
    }
}
