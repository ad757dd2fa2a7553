//! Bounded reads and writes of deal collections over a [`KeyValueStore`].

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::domain::deal::RawDeal;
use crate::repository::KeyValueStore;
use crate::repository::errors::{RepositoryError, RepositoryResult};

static STORAGE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]{1,64}$").expect("valid storage key pattern"));

/// Size ceilings enforced on every stored collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageLimits {
    pub max_bytes: usize,
    pub max_deals: usize,
}

impl Default for StorageLimits {
    fn default() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
            max_deals: 1000,
        }
    }
}

/// Rejects anything but short `[A-Za-z0-9_-]` identifiers.
pub fn validate_storage_key(key: &str) -> RepositoryResult<()> {
    if STORAGE_KEY_RE.is_match(key) {
        Ok(())
    } else {
        Err(RepositoryError::InvalidKey(key.chars().take(64).collect()))
    }
}

/// Storage gateway for deal logs.
pub struct DealStorage<S> {
    store: S,
    limits: StorageLimits,
}

impl<S: KeyValueStore> DealStorage<S> {
    pub fn new(store: S) -> Self {
        Self::with_limits(store, StorageLimits::default())
    }

    pub fn with_limits(store: S, limits: StorageLimits) -> Self {
        Self { store, limits }
    }

    pub fn limits(&self) -> StorageLimits {
        self.limits
    }

    /// Reads the collection under `key`, reporting why it could not be read.
    ///
    /// A missing key is an empty collection. Oversized arrays are truncated
    /// and non-object elements dropped.
    pub fn try_load(&self, key: &str) -> RepositoryResult<Vec<RawDeal>> {
        validate_storage_key(key)?;

        let Some(payload) = self.store.get(key)? else {
            return Ok(Vec::new());
        };

        if payload.len() > self.limits.max_bytes {
            return Err(RepositoryError::PayloadTooLarge {
                size: payload.len(),
                limit: self.limits.max_bytes,
            });
        }

        let Value::Array(items) = serde_json::from_str::<Value>(&payload)? else {
            return Err(RepositoryError::ValidationError(format!(
                "value stored under {key} is not an array"
            )));
        };

        if items.len() > self.limits.max_deals {
            log::warn!(
                "Truncating {} stored deals under {key} to {}",
                items.len(),
                self.limits.max_deals
            );
        }

        let total = items.len().min(self.limits.max_deals);
        let deals: Vec<RawDeal> = items
            .into_iter()
            .take(self.limits.max_deals)
            .filter_map(|item| RawDeal::try_from(item).ok())
            .collect();
        if deals.len() < total {
            log::warn!(
                "Dropped {} non-object entries under {key}",
                total - deals.len()
            );
        }

        Ok(deals)
    }

    /// Reads the collection under `key`; any failure yields an empty list.
    pub fn load(&self, key: &str) -> Vec<RawDeal> {
        self.try_load(key).unwrap_or_else(|err| {
            log::error!("Failed to load deals from {key}: {err}");
            Vec::new()
        })
    }

    /// Replaces the collection under `key`, keeping at most `max_deals`
    /// entries. Returns the number of entries written.
    pub fn save<T: Serialize>(&self, key: &str, deals: &[T]) -> RepositoryResult<usize> {
        validate_storage_key(key)?;

        let kept = &deals[..deals.len().min(self.limits.max_deals)];
        if kept.len() < deals.len() {
            log::warn!(
                "Truncating {} deals to {} before saving under {key}",
                deals.len(),
                kept.len()
            );
        }

        let payload = serde_json::to_string(kept)?;
        if payload.len() > self.limits.max_bytes {
            return Err(RepositoryError::PayloadTooLarge {
                size: payload.len(),
                limit: self.limits.max_bytes,
            });
        }

        self.store.set(key, &payload)?;
        Ok(kept.len())
    }

    /// Appends one deal, evicting the oldest entries when the collection is
    /// full.
    pub fn append<T: Serialize>(&self, key: &str, deal: &T) -> RepositoryResult<usize> {
        let mut deals: Vec<Value> = self
            .try_load(key)?
            .into_iter()
            .map(RawDeal::into_value)
            .collect();

        let overflow = (deals.len() + 1).saturating_sub(self.limits.max_deals);
        if overflow > 0 {
            log::info!("Evicting {overflow} oldest deals under {key}");
            deals.drain(..overflow.min(deals.len()));
        }
        deals.push(serde_json::to_value(deal)?);

        self.save(key, &deals)
    }

    pub fn clear(&self, key: &str) -> RepositoryResult<()> {
        validate_storage_key(key)?;
        self.store.remove(key)
    }
}
