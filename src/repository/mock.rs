//! Mock store implementation for isolating services in tests.

use mockall::mock;

use crate::repository::KeyValueStore;
use crate::repository::errors::RepositoryResult;

mock! {
    pub Repository {}

    impl KeyValueStore for Repository {
        fn get(&self, key: &str) -> RepositoryResult<Option<String>>;
        fn set(&self, key: &str, value: &str) -> RepositoryResult<()>;
        fn remove(&self, key: &str) -> RepositoryResult<()>;
    }
}
