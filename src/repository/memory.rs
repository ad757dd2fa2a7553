//! In-process [`KeyValueStore`] for embedding and tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::repository::KeyValueStore;
use crate::repository::errors::{RepositoryError, RepositoryResult};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> RepositoryResult<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|err| RepositoryError::Unexpected(format!("Store lock poisoned: {err}")))
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> RepositoryResult<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> RepositoryResult<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> RepositoryResult<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}
