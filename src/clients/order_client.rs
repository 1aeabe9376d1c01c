use tracing::{debug, error, info, instrument, warn};

use crate::actor_framework::ResourceClient;
use crate::chat_actor::ChatError;
use crate::clients::{ChatClient, UserClient};
use crate::domain::progress;
use crate::domain::{Actor, ChatParticipant, ChatRoom, Order, OrderCreate, OrderPatch, Role, StageTag, User, UserKey};
use crate::order_actor::{OrderAction, OrderError};

/// Attempts at finding an unused six-digit order id before giving up.
const ID_ATTEMPTS: usize = 3;

/// Client for interacting with the Order actor.
///
/// Orchestrates the user directory and the chat rooms around the order store:
/// the creator is verified before an order is created, and every order gets
/// its chat room.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
    user_client: UserClient,
    chat_client: ChatClient,
}

impl OrderClient {
    pub fn new(inner: ResourceClient<Order>, user_client: UserClient, chat_client: ChatClient) -> Self {
        Self {
            inner,
            user_client,
            chat_client,
        }
    }

    /// Creates an order on behalf of a registered agent, plus its chat room.
    ///
    /// If the chat room cannot be created the order is removed again.
    #[instrument(
        skip(self, params),
        fields(
            created_by = %params.created_by,
            renter = %params.renter_email,
            landlord = %params.landlord_email,
            deposit = %params.deposit_amount
        )
    )]
    pub async fn create_order(&self, params: OrderCreate) -> Result<Order, OrderError> {
        info!("Processing create_order request");

        // Step 1: Verify the creator is an agent
        let creator = match self
            .user_client
            .get_user(UserKey::new(params.created_by.clone(), Role::Agent))
            .await
        {
            Ok(Some(user)) => {
                info!(user_name = %user.name, "Creator verified");
                user
            }
            Ok(None) => {
                error!("Creator is not a registered agent");
                return Err(OrderError::NotAuthorized("only agents can create orders".to_string()));
            }
            Err(e) => {
                error!(error = %e, "Creator lookup failed");
                return Err(OrderError::UserLookup(e.to_string()));
            }
        };

        // Step 2: Create the order
        let order = self.create_with_fresh_id(params).await?;
        info!(order_id = %order.id, "Order stored");

        // Step 3: Open the chat room, undoing step 2 on failure
        let participants = match self.participants_for(&order, &creator).await {
            Ok(participants) => participants,
            Err(e) => {
                self.roll_back(&order, &creator).await;
                return Err(e);
            }
        };
        if let Err(e) = self.chat_client.create_room(order.id.clone(), participants).await {
            error!(error = %e, "Chat room creation failed");
            self.roll_back(&order, &creator).await;
            return Err(OrderError::ChatRoom(e.to_string()));
        }

        info!(order_id = %order.id, "Order created successfully");
        Ok(order)
    }

    async fn create_with_fresh_id(&self, params: OrderCreate) -> Result<Order, OrderError> {
        let mut attempt = 1;
        loop {
            match self.inner.create(params.clone()).await.map_err(OrderError::from) {
                Err(OrderError::AlreadyExists(id)) if attempt < ID_ATTEMPTS => {
                    warn!(id = %id, attempt, "Order id collision, retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn participants_for(&self, order: &Order, creator: &User) -> Result<Vec<ChatParticipant>, OrderError> {
        let renter_name = self
            .user_client
            .display_name(&order.renter_email, Role::Renter)
            .await
            .map_err(|e| OrderError::UserLookup(e.to_string()))?;
        let landlord_name = self
            .user_client
            .display_name(&order.landlord_email, Role::Landlord)
            .await
            .map_err(|e| OrderError::UserLookup(e.to_string()))?;

        Ok(vec![
            ChatParticipant {
                email: creator.email.clone(),
                role: Role::Agent,
                name: creator.name.clone(),
            },
            ChatParticipant {
                email: order.renter_email.clone(),
                role: Role::Renter,
                name: renter_name,
            },
            ChatParticipant {
                email: order.landlord_email.clone(),
                role: Role::Landlord,
                name: landlord_name,
            },
        ])
    }

    async fn roll_back(&self, order: &Order, creator: &User) {
        match self.inner.delete(order.id.clone(), creator.actor()).await {
            Ok(()) => warn!(order_id = %order.id, "Order rolled back"),
            Err(e) => error!(order_id = %order.id, error = %e, "Rollback failed, order left without chat room"),
        }
    }

    /// Edits order details. A new renter or landlord also takes over that seat in the chat room.
    #[instrument(skip(self, patch))]
    pub async fn update_order(&self, id: String, patch: OrderPatch) -> Result<Order, OrderError> {
        debug!(patch = ?patch, "Sending request");
        let renter_changed = patch.renter_email.is_some();
        let landlord_changed = patch.landlord_email.is_some();
        let order = self.inner.update(id, patch).await?;

        if renter_changed {
            self.seat_party(&order, &order.renter_email, Role::Renter).await?;
        }
        if landlord_changed {
            self.seat_party(&order, &order.landlord_email, Role::Landlord).await?;
        }
        Ok(order)
    }

    async fn seat_party(&self, order: &Order, email: &str, role: Role) -> Result<(), OrderError> {
        let name = self
            .user_client
            .display_name(email, role)
            .await
            .map_err(|e| OrderError::UserLookup(e.to_string()))?;
        let participant = ChatParticipant { email: email.to_string(), role, name };
        if let Err(e) = self.chat_client.replace_participant(order.id.clone(), participant).await {
            error!(order_id = %order.id, error = %e, "Chat room out of step with order parties");
            return Err(OrderError::ChatRoom(e.to_string()));
        }
        Ok(())
    }

    /// Applies `actor`'s approval of `stage` as one atomic step inside the order actor.
    #[instrument(skip(self, stage, actor), fields(stage = %stage, actor = %actor))]
    pub async fn approve_stage(&self, id: String, stage: StageTag, actor: Actor) -> Result<Order, OrderError> {
        debug!("Sending request");
        let order = self.inner.perform_action(id, OrderAction::Approve { stage, actor }).await?;
        info!(status = %order.status, progress = progress::progress_percentage(&order), "Stage approved");
        Ok(order)
    }

    /// Approves whichever review stage belongs to the actor's role.
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn approve_as(&self, id: String, actor: Actor) -> Result<Order, OrderError> {
        let stage = progress::approval_stage_for(actor.role).ok_or_else(|| {
            OrderError::NotAuthorized(format!("{} has no review stage to approve", actor.role))
        })?;
        self.approve_stage(id, stage, actor).await
    }

    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn finalize_order(&self, id: String, actor: Actor) -> Result<Order, OrderError> {
        debug!("Sending request");
        let order = self.inner.perform_action(id, OrderAction::Finalize { actor }).await?;
        info!(status = %order.status, "Order finalized");
        Ok(order)
    }

    /// Deletes an order and its chat room. Only the creating agent may do this.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, id: String, requested_by: &str) -> Result<(), OrderError> {
        info!("Processing delete_order request");

        if self.get_order(id.clone()).await?.is_none() {
            return Err(OrderError::NotFound(id));
        }

        let requester = match self
            .user_client
            .get_user(UserKey::new(requested_by, Role::Agent))
            .await
        {
            Ok(Some(user)) => user.actor(),
            Ok(None) => {
                return Err(OrderError::NotAuthorized("only agents can delete orders".to_string()))
            }
            Err(e) => return Err(OrderError::UserLookup(e.to_string())),
        };

        self.inner.delete(id.clone(), requester).await?;

        match self.chat_client.delete_room(id).await {
            Ok(()) => debug!("Chat room deleted"),
            Err(ChatError::NotFound(_)) => debug!("Order had no chat room"),
            Err(e) => warn!(error = %e, "Chat room cleanup failed"),
        }

        info!("Order deleted");
        Ok(())
    }

    /// Orders visible to `email` acting as `role`, newest first.
    #[instrument(skip(self))]
    pub async fn orders_for_user(&self, email: &str, role: Role) -> Result<Vec<Order>, OrderError> {
        let mut orders: Vec<Order> = self
            .list_orders()
            .await?
            .into_iter()
            .filter(|o| o.involves(email, role))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        debug!(count = orders.len(), "Listed orders");
        Ok(orders)
    }

    #[instrument(skip(self))]
    pub async fn progress(&self, id: String) -> Result<u8, OrderError> {
        self.get_order(id.clone())
            .await?
            .map(|order| progress::progress_percentage(&order))
            .ok_or(OrderError::NotFound(id))
    }

    /// Chat rooms of every order `email` takes part in, in any role.
    #[instrument(skip(self))]
    pub async fn chat_rooms_for_user(&self, email: &str) -> Result<Vec<ChatRoom>, OrderError> {
        let mut orders: Vec<Order> = self
            .list_orders()
            .await?
            .into_iter()
            .filter(|o| o.has_party(email))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut rooms = Vec::with_capacity(orders.len());
        for order in orders {
            match self.chat_client.get_chat_room(order.id).await {
                Ok(Some(room)) => rooms.push(room),
                Ok(None) => {}
                Err(e) => return Err(OrderError::ChatRoom(e.to_string())),
            }
        }
        Ok(rooms)
    }
}

crate::impl_client_methods!(OrderClient, Order, OrderError, order);
