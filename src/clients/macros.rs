/// Generates the read-side methods every client shares: `get_<name>` and `list_<name>s`.
#[macro_export]
macro_rules! impl_client_methods {
    ($client_name:ident, $entity:ty, $error:ty, $entity_name_snake:ident) => {
        paste::paste! {
            impl $client_name {
                #[tracing::instrument(skip(self))]
                pub async fn [<get_ $entity_name_snake>](
                    &self,
                    id: <$entity as $crate::actor_framework::Entity>::Id,
                ) -> Result<Option<$entity>, $error> {
                    tracing::debug!("Sending request");
                    self.inner.get(id).await.map_err(<$error>::from)
                }

                #[tracing::instrument(skip(self))]
                pub async fn [<list_ $entity_name_snake s>](&self) -> Result<Vec<$entity>, $error> {
                    tracing::debug!("Sending request");
                    self.inner.list().await.map_err(<$error>::from)
                }
            }
        }
    };
}

#[macro_export]
macro_rules! impl_client_new {
    ($client_name:ident, $entity:ty) => {
        impl $client_name {
            pub fn new(inner: $crate::actor_framework::ResourceClient<$entity>) -> Self {
                Self { inner }
            }
        }
    };
}

#[macro_export]
macro_rules! impl_basic_client {
    ($client_name:ident, $entity:ty, $error:ty, $entity_name_snake:ident) => {
        $crate::impl_client_new!($client_name, $entity);
        $crate::impl_client_methods!($client_name, $entity, $error, $entity_name_snake);
    };
}

/// Folds the actor plumbing errors into a service error enum.
///
/// The target enum needs `NotFound(String)`, `AlreadyExists(String)`,
/// `StorageError(String)` and `ActorCommunicationError(String)` variants.
#[macro_export]
macro_rules! impl_from_framework_error {
    ($error:ty) => {
        impl From<$crate::actor_framework::FrameworkError<$error>> for $error {
            fn from(err: $crate::actor_framework::FrameworkError<$error>) -> Self {
                use $crate::actor_framework::FrameworkError;
                match err {
                    FrameworkError::NotFound { id, .. } => <$error>::NotFound(id),
                    FrameworkError::AlreadyExists { id, .. } => <$error>::AlreadyExists(id),
                    FrameworkError::Domain(e) => e,
                    FrameworkError::Storage(e) => <$error>::StorageError(e.to_string()),
                    e @ (FrameworkError::ActorClosed | FrameworkError::ActorDropped) => {
                        <$error>::ActorCommunicationError(e.to_string())
                    }
                }
            }
        }
    };
}
