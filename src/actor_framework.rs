use std::fmt::{Debug, Display};
use std::hash::Hash;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument, warn};

use crate::persistence::{StorageError, Store};

// =============================================================================
// 1. THE ABSTRACTION (Entity trait with lifecycle hooks and custom actions)
// =============================================================================

/// Trait that any domain entity must implement to be managed by [`ResourceActor`].
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// Short name used in spans and error messages ("order", "user", ...).
    const KIND: &'static str;

    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug + 'static;
    type CreateParams: Send + Debug + 'static;
    type Patch: Send + Debug + 'static;
    type Action: Send + Debug + 'static;
    type ActionResult: Send + Debug + 'static;
    /// Context the caller hands to a delete, checked by [`Entity::on_delete`].
    type DeleteGuard: Send + Debug + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    fn id(&self) -> Self::Id;

    /// Construct the full entity from the assigned ID and the creation parameters.
    fn from_create_params(id: Self::Id, params: Self::CreateParams) -> Result<Self, Self::Error>;

    // --- Lifecycle Hooks ---

    fn on_create(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn on_update(&mut self, patch: Self::Patch) -> Result<(), Self::Error>;

    fn on_delete(&self, _guard: &Self::DeleteGuard) -> Result<(), Self::Error> {
        Ok(())
    }

    // --- Action Handler ---

    /// Handle a custom domain-specific action.
    fn handle_action(&mut self, action: Self::Action) -> Result<Self::ActionResult, Self::Error>;
}

/// Failures produced by the actor plumbing, wrapping the entity's own error type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameworkError<E> {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },
    #[error("{0}")]
    Domain(E),
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
    #[error("actor closed")]
    ActorClosed,
    #[error("actor dropped the response")]
    ActorDropped,
}

// =============================================================================
// 2. THE GENERIC MESSAGES
// =============================================================================

pub type Response<T, E> = oneshot::Sender<Result<T, FrameworkError<E>>>;

#[derive(Debug)]
pub enum ResourceRequest<T: Entity> {
    Create {
        params: T::CreateParams,
        respond_to: Response<T, T::Error>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>, T::Error>,
    },
    List {
        respond_to: Response<Vec<T>, T::Error>,
    },
    Update {
        id: T::Id,
        patch: T::Patch,
        respond_to: Response<T, T::Error>,
    },
    Delete {
        id: T::Id,
        guard: T::DeleteGuard,
        respond_to: Response<(), T::Error>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult, T::Error>,
    },
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

type IdFn<T> = Box<dyn Fn(&<T as Entity>::CreateParams) -> <T as Entity>::Id + Send + Sync>;

/// Owns one [`Store`] and serializes every request against it.
///
/// Updates and actions run on a copy of the stored entity and are written back
/// only when the hook succeeds, so a rejected request never leaves a partial
/// mutation behind.
pub struct ResourceActor<T: Entity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: Box<dyn Store<T>>,
    next_id_fn: IdFn<T>,
}

impl<T: Entity> ResourceActor<T> {
    pub fn new(
        buffer_size: usize,
        store: Box<dyn Store<T>>,
        next_id_fn: impl Fn(&T::CreateParams) -> T::Id + Send + Sync + 'static,
    ) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store,
            next_id_fn: Box::new(next_id_fn),
        };
        (actor, ResourceClient::new(sender))
    }

    #[instrument(name = "resource_actor", skip(self), fields(entity = T::KIND))]
    pub async fn run(mut self) {
        info!("Actor starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Create { params, respond_to } => {
                    let _ = respond_to.send(self.handle_create(params));
                }
                ResourceRequest::Get { id, respond_to } => {
                    let _ = respond_to.send(self.store.get(&id).map_err(FrameworkError::from));
                }
                ResourceRequest::List { respond_to } => {
                    let _ = respond_to.send(self.store.list().map_err(FrameworkError::from));
                }
                ResourceRequest::Update { id, patch, respond_to } => {
                    let _ = respond_to.send(self.handle_update(id, patch));
                }
                ResourceRequest::Delete { id, guard, respond_to } => {
                    let _ = respond_to.send(self.handle_delete(id, guard));
                }
                ResourceRequest::Action { id, action, respond_to } => {
                    let _ = respond_to.send(self.handle_action(id, action));
                }
            }
        }

        info!("Actor stopped");
    }

    #[instrument(skip_all)]
    fn handle_create(&mut self, params: T::CreateParams) -> Result<T, FrameworkError<T::Error>> {
        let id = (self.next_id_fn)(&params);
        debug!(id = %id, "Processing create request");

        if self.store.get(&id)?.is_some() {
            warn!(id = %id, "Create rejected: id already taken");
            return Err(FrameworkError::AlreadyExists { kind: T::KIND, id: id.to_string() });
        }

        let mut item = T::from_create_params(id.clone(), params).map_err(FrameworkError::Domain)?;
        item.on_create().map_err(FrameworkError::Domain)?;
        self.store.put(item.clone())?;

        info!(id = %id, "Created");
        Ok(item)
    }

    #[instrument(skip_all, fields(id = %id))]
    fn handle_update(&mut self, id: T::Id, patch: T::Patch) -> Result<T, FrameworkError<T::Error>> {
        debug!("Processing update request");
        let mut item = self.load(&id)?;
        item.on_update(patch).map_err(FrameworkError::Domain)?;
        self.store.put(item.clone())?;
        Ok(item)
    }

    #[instrument(skip_all, fields(id = %id))]
    fn handle_delete(&mut self, id: T::Id, guard: T::DeleteGuard) -> Result<(), FrameworkError<T::Error>> {
        debug!("Processing delete request");
        let item = self.load(&id)?;
        item.on_delete(&guard).map_err(FrameworkError::Domain)?;
        self.store.delete(&id)?;
        info!("Deleted");
        Ok(())
    }

    #[instrument(skip_all, fields(id = %id))]
    fn handle_action(
        &mut self,
        id: T::Id,
        action: T::Action,
    ) -> Result<T::ActionResult, FrameworkError<T::Error>> {
        debug!(action = ?action, "Processing action request");
        let mut item = self.load(&id)?;
        match item.handle_action(action) {
            Ok(result) => {
                self.store.put(item)?;
                Ok(result)
            }
            Err(e) => {
                warn!(error = %e, "Action rejected");
                Err(FrameworkError::Domain(e))
            }
        }
    }

    fn load(&self, id: &T::Id) -> Result<T, FrameworkError<T::Error>> {
        match self.store.get(id) {
            Ok(Some(item)) => Ok(item),
            Ok(None) => Err(FrameworkError::NotFound { kind: T::KIND, id: id.to_string() }),
            Err(e) => {
                error!(error = %e, "Store read failed");
                Err(e.into())
            }
        }
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

pub struct ResourceClient<T: Entity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
}

// Manual impl: deriving would require `T: Clone` bounds on the message types.
impl<T: Entity> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

impl<T: Entity> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { sender }
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(Response<R, T::Error>) -> ResourceRequest<T>,
    ) -> Result<R, FrameworkError<T::Error>> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn create(&self, params: T::CreateParams) -> Result<T, FrameworkError<T::Error>> {
        self.request(|respond_to| ResourceRequest::Create { params, respond_to }).await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, FrameworkError<T::Error>> {
        self.request(|respond_to| ResourceRequest::Get { id, respond_to }).await
    }

    pub async fn list(&self) -> Result<Vec<T>, FrameworkError<T::Error>> {
        self.request(|respond_to| ResourceRequest::List { respond_to }).await
    }

    pub async fn update(&self, id: T::Id, patch: T::Patch) -> Result<T, FrameworkError<T::Error>> {
        self.request(|respond_to| ResourceRequest::Update { id, patch, respond_to }).await
    }

    pub async fn delete(&self, id: T::Id, guard: T::DeleteGuard) -> Result<(), FrameworkError<T::Error>> {
        self.request(|respond_to| ResourceRequest::Delete { id, guard, respond_to }).await
    }

    pub async fn perform_action(
        &self,
        id: T::Id,
        action: T::Action,
    ) -> Result<T::ActionResult, FrameworkError<T::Error>> {
        self.request(|respond_to| ResourceRequest::Action { id, action, respond_to }).await
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::memory::MemoryStore;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Debug, PartialEq)]
    struct Ticket {
        id: String,
        owner: String,
        stamps: u32,
    }

    #[derive(Debug, Clone, PartialEq, Error)]
    enum TicketError {
        #[error("ticket is full")]
        Full,
        #[error("only {0} may delete this ticket")]
        NotOwner(String),
    }

    #[derive(Debug)]
    enum TicketAction {
        Stamp,
        StampMany(u32),
    }

    impl Entity for Ticket {
        const KIND: &'static str = "ticket";
        type Id = String;
        type CreateParams = String;
        type Patch = String;
        type Action = TicketAction;
        type ActionResult = u32;
        type DeleteGuard = String;
        type Error = TicketError;

        fn id(&self) -> String {
            self.id.clone()
        }

        fn from_create_params(id: String, owner: String) -> Result<Self, TicketError> {
            Ok(Self { id, owner, stamps: 0 })
        }

        fn on_update(&mut self, owner: String) -> Result<(), TicketError> {
            self.owner = owner;
            Ok(())
        }

        fn on_delete(&self, requester: &String) -> Result<(), TicketError> {
            if *requester == self.owner {
                Ok(())
            } else {
                Err(TicketError::NotOwner(self.owner.clone()))
            }
        }

        fn handle_action(&mut self, action: TicketAction) -> Result<u32, TicketError> {
            let count = match action {
                TicketAction::Stamp => 1,
                TicketAction::StampMany(n) => n,
            };
            // Mutate first so a rejected action proves the actor discards the copy.
            self.stamps += count;
            if self.stamps > 3 {
                return Err(TicketError::Full);
            }
            Ok(self.stamps)
        }
    }

    fn spawn_tickets() -> ResourceClient<Ticket> {
        let counter = Arc::new(AtomicU64::new(1));
        let next_id = move |_: &String| format!("ticket_{}", counter.fetch_add(1, Ordering::SeqCst));
        let (actor, client) = ResourceActor::<Ticket>::new(10, Box::new(MemoryStore::new()), next_id);
        tokio::spawn(actor.run());
        client
    }

    #[tokio::test]
    async fn test_resource_actor_with_actions() {
        let client = spawn_tickets();

        let ticket = client.create("alice".to_string()).await.unwrap();
        assert_eq!(ticket.id, "ticket_1");

        assert_eq!(client.perform_action(ticket.id.clone(), TicketAction::Stamp).await, Ok(1));
        assert_eq!(client.perform_action(ticket.id.clone(), TicketAction::StampMany(2)).await, Ok(3));

        let stored = client.get(ticket.id.clone()).await.unwrap().unwrap();
        assert_eq!(stored.stamps, 3);
    }

    #[tokio::test]
    async fn test_rejected_action_leaves_entity_untouched() {
        let client = spawn_tickets();
        let ticket = client.create("alice".to_string()).await.unwrap();

        let result = client.perform_action(ticket.id.clone(), TicketAction::StampMany(5)).await;
        assert_eq!(result, Err(FrameworkError::Domain(TicketError::Full)));

        let stored = client.get(ticket.id.clone()).await.unwrap().unwrap();
        assert_eq!(stored.stamps, 0);
    }

    #[tokio::test]
    async fn test_delete_runs_guard() {
        let client = spawn_tickets();
        let ticket = client.create("alice".to_string()).await.unwrap();

        let denied = client.delete(ticket.id.clone(), "mallory".to_string()).await;
        assert_eq!(denied, Err(FrameworkError::Domain(TicketError::NotOwner("alice".to_string()))));

        client.delete(ticket.id.clone(), "alice".to_string()).await.unwrap();
        assert_eq!(client.get(ticket.id.clone()).await.unwrap(), None);

        let missing = client.delete(ticket.id.clone(), "alice".to_string()).await;
        assert!(matches!(missing, Err(FrameworkError::NotFound { kind: "ticket", .. })));
    }

    #[tokio::test]
    async fn test_create_rejects_taken_id() {
        let (actor, client) =
            ResourceActor::<Ticket>::new(10, Box::new(MemoryStore::new()), |owner: &String| owner.clone());
        tokio::spawn(actor.run());

        client.create("bob".to_string()).await.unwrap();
        let again = client.create("bob".to_string()).await;
        assert!(matches!(again, Err(FrameworkError::AlreadyExists { kind: "ticket", .. })));
        assert_eq!(client.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_actor_reports_error() {
        let (actor, client) =
            ResourceActor::<Ticket>::new(1, Box::new(MemoryStore::new()), |owner: &String| owner.clone());
        drop(actor);
        assert_eq!(client.get("x".to_string()).await, Err(FrameworkError::ActorClosed));
    }
}
