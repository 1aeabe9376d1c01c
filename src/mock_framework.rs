//! # Mock Framework
//!
//! Utilities for testing clients in isolation.
//!
//! [`create_mock_client`] hands out a client plus the receiving end of its
//! channel; the `expect_*` helpers pull the next request off that channel and
//! return its payload with the responder, so a test can assert what a client
//! sent and script the actor's answer.

use tokio::sync::mpsc;

use crate::actor_framework::{Entity, ResourceClient, ResourceRequest, Response};

pub type MockReceiver<T> = mpsc::Receiver<ResourceRequest<T>>;

/// Creates a mock client and a receiver for asserting requests.
pub fn create_mock_client<T: Entity>(buffer_size: usize) -> (ResourceClient<T>, MockReceiver<T>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Next message must be a Create request.
pub async fn expect_create<T: Entity>(
    receiver: &mut MockReceiver<T>,
) -> Option<(T::CreateParams, Response<T, T::Error>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create { params, respond_to }) => Some((params, respond_to)),
        _ => None,
    }
}

/// Next message must be a Get request.
pub async fn expect_get<T: Entity>(
    receiver: &mut MockReceiver<T>,
) -> Option<(T::Id, Response<Option<T>, T::Error>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Next message must be a List request.
pub async fn expect_list<T: Entity>(receiver: &mut MockReceiver<T>) -> Option<Response<Vec<T>, T::Error>> {
    match receiver.recv().await {
        Some(ResourceRequest::List { respond_to }) => Some(respond_to),
        _ => None,
    }
}

/// Next message must be an Action request.
pub async fn expect_action<T: Entity>(
    receiver: &mut MockReceiver<T>,
) -> Option<(T::Id, T::Action, Response<T::ActionResult, T::Error>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action { id, action, respond_to }) => Some((id, action, respond_to)),
        _ => None,
    }
}

/// Next message must be a Delete request.
pub async fn expect_delete<T: Entity>(
    receiver: &mut MockReceiver<T>,
) -> Option<(T::Id, T::DeleteGuard, Response<(), T::Error>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Delete { id, guard, respond_to }) => Some((id, guard, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor_framework::FrameworkError;
    use crate::domain::{Role, User, UserCreate};
    use crate::user_actor::UserError;

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<User>(10);

        // Test Create
        let create_task = tokio::spawn(async move {
            let user = UserCreate {
                email: "test@example.com".to_string(),
                role: Role::Renter,
                name: Some("Test".to_string()),
            };
            client.create(user).await
        });

        let (payload, responder) = expect_create(&mut receiver).await.expect("Expected Create request");
        assert_eq!(payload.name.as_deref(), Some("Test"));
        responder
            .send(Err(FrameworkError::Domain(UserError::ValidationError("nope".to_string()))))
            .unwrap();

        let result = create_task.await.unwrap();
        assert_eq!(
            result.map_err(UserError::from),
            Err(UserError::ValidationError("nope".to_string()))
        );
    }
}
