//! JSON snapshot storage.
//!
//! The whole collection lives in memory and is written back as one
//! pretty-printed JSON array after every mutation. Writes go to a sibling
//! `.tmp` file first and are renamed into place, so a crash mid-write leaves the
//! previous snapshot intact.
//!
//! I/O is blocking `std::fs` called from the owning actor's task, so each write
//! holds a runtime worker thread until the rename returns. Keep snapshots small
//! or move the store behind `spawn_blocking` if they grow.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use super::{StorageError, Store};
use crate::actor_framework::Entity;

pub struct JsonFileStore<T: Entity> {
    path: PathBuf,
    items: HashMap<T::Id, T>,
}

impl<T> JsonFileStore<T>
where
    T: Entity + Serialize + DeserializeOwned,
{
    /// Load the snapshot at `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let items = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
            let list: Vec<T> = if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw).map_err(|e| StorageError::Serialization(e.to_string()))?
            };
            list.into_iter().map(|item| (item.id(), item)).collect()
        } else {
            HashMap::new()
        };

        info!(path = %path.display(), entity = T::KIND, count = items.len(), "Opened JSON store");
        Ok(Self { path, items })
    }

    fn flush(&self) -> Result<(), StorageError> {
        let snapshot: Vec<&T> = self.items.values().collect();
        let bytes = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| io_error(&self.path, e))?;

        debug!(path = %self.path.display(), count = snapshot.len(), "Flushed snapshot");
        Ok(())
    }
}

fn io_error(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

impl<T> Store<T> for JsonFileStore<T>
where
    T: Entity + Serialize + DeserializeOwned,
{
    fn get(&self, id: &T::Id) -> Result<Option<T>, StorageError> {
        Ok(self.items.get(id).cloned())
    }

    fn put(&mut self, item: T) -> Result<(), StorageError> {
        let id = item.id();
        let previous = self.items.insert(id.clone(), item);
        if let Err(e) = self.flush() {
            // Keep memory and disk in agreement when the write fails.
            match previous {
                Some(old) => self.items.insert(id, old),
                None => self.items.remove(&id),
            };
            return Err(e);
        }
        Ok(())
    }

    fn delete(&mut self, id: &T::Id) -> Result<bool, StorageError> {
        match self.items.remove(id) {
            Some(old) => {
                if let Err(e) = self.flush() {
                    self.items.insert(id.clone(), old);
                    return Err(e);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn list(&self) -> Result<Vec<T>, StorageError> {
        Ok(self.items.values().cloned().collect())
    }
}
