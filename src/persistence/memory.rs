use std::collections::HashMap;

use super::{StorageError, Store};
use crate::actor_framework::Entity;

/// In-memory storage, lost when the actor stops.
pub struct MemoryStore<T: Entity> {
    items: HashMap<T::Id, T>,
}

impl<T: Entity> MemoryStore<T> {
    pub fn new() -> Self {
        Self { items: HashMap::new() }
    }
}

impl<T: Entity> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Store<T> for MemoryStore<T> {
    fn get(&self, id: &T::Id) -> Result<Option<T>, StorageError> {
        Ok(self.items.get(id).cloned())
    }

    fn put(&mut self, item: T) -> Result<(), StorageError> {
        self.items.insert(item.id(), item);
        Ok(())
    }

    fn delete(&mut self, id: &T::Id) -> Result<bool, StorageError> {
        Ok(self.items.remove(id).is_some())
    }

    fn list(&self) -> Result<Vec<T>, StorageError> {
        Ok(self.items.values().cloned().collect())
    }
}
