//! Persistence port for the resource actors.
//!
//! Each [`ResourceActor`](crate::actor_framework::ResourceActor) owns exactly one
//! [`Store`], so implementations need no internal locking: the actor is the only
//! writer and serializes every request.

pub mod file;
pub mod memory;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::actor_framework::Entity;
use crate::config::StorageConfig;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// get / put / delete / list over one entity kind.
pub trait Store<T: Entity>: Send {
    fn get(&self, id: &T::Id) -> Result<Option<T>, StorageError>;

    /// Insert or replace the entity stored under `item.id()`.
    fn put(&mut self, item: T) -> Result<(), StorageError>;

    /// Returns whether something was removed.
    fn delete(&mut self, id: &T::Id) -> Result<bool, StorageError>;

    fn list(&self) -> Result<Vec<T>, StorageError>;
}

/// Open the store selected by `config` for one entity kind.
///
/// `file_name` names the snapshot file when the file backend is selected.
pub fn open_store<T>(config: &StorageConfig, file_name: &str) -> Result<Box<dyn Store<T>>, StorageError>
where
    T: Entity + Serialize + DeserializeOwned,
{
    match config {
        StorageConfig::Memory => Ok(Box::new(memory::MemoryStore::new())),
        StorageConfig::File { data_dir } => {
            Ok(Box::new(file::JsonFileStore::open(data_dir.join(file_name))?))
        }
    }
}
