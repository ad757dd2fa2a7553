//! Persistence for deal logs.
//!
//! The pipeline only needs a string key-value store; [`storage::DealStorage`]
//! layers the size and format bounds on top of any [`KeyValueStore`].

use crate::repository::errors::RepositoryResult;

#[cfg(feature = "db")]
use crate::db::{DbConnection, DbPool, get_connection};

pub mod errors;
pub mod memory;
#[cfg(feature = "test-mocks")]
pub mod mock;
pub mod storage;
#[cfg(feature = "db")]
pub mod store;

/// Single-client, last-write-wins string store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> RepositoryResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> RepositoryResult<()>;
    fn remove(&self, key: &str) -> RepositoryResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> RepositoryResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> RepositoryResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> RepositoryResult<()> {
        (**self).remove(key)
    }
}

/// SQLite-backed [`KeyValueStore`].
#[cfg(feature = "db")]
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool,
}

#[cfg(feature = "db")]
impl DieselRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> RepositoryResult<DbConnection> {
        Ok(get_connection(&self.pool)?)
    }
}
