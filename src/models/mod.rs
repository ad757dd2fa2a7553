//! Configuration and database models.

pub mod config;
#[cfg(feature = "db")]
pub mod kv_entry;
