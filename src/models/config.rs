//! Configuration model loaded from external sources.

use serde::Deserialize;

use crate::repository::storage::StorageLimits;

#[derive(Clone, Debug, Deserialize)]
/// Settings for the SQLite deal store.
pub struct DatabaseSettings {
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_true")]
    pub enable_wal: bool,
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    #[serde(default = "default_max_deals")]
    pub max_deals: usize,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
/// Top-level configuration for the deal pipeline binary.
pub struct AppConfig {
    pub database: DatabaseSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

impl From<&StorageSettings> for StorageLimits {
    fn from(settings: &StorageSettings) -> Self {
        StorageLimits {
            max_bytes: settings.max_bytes,
            max_deals: settings.max_deals,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            max_deals: default_max_deals(),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_pool_size() -> u32 {
    4
}

fn default_true() -> bool {
    true
}

fn default_busy_timeout_secs() -> u64 {
    30
}

fn default_max_bytes() -> usize {
    StorageLimits::default().max_bytes
}

fn default_max_deals() -> usize {
    StorageLimits::default().max_deals
}

fn default_max_requests() -> usize {
    10
}

fn default_window_secs() -> u64 {
    60
}
