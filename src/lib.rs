//! Deal normalization and dashboard aggregation for dealership sales teams.
//!
//! Untrusted deal records flow from a [`repository::KeyValueStore`] through
//! the [`pipeline`] (validation, mapping, aggregation) into the
//! [`services::dashboard`] facade.

#[cfg(feature = "db")]
pub mod db;
#[cfg(feature = "data")]
pub mod domain;
#[cfg(feature = "data")]
pub mod dto;
#[cfg(feature = "data")]
pub mod error_conversions;
#[cfg(feature = "data")]
pub mod forms;
#[cfg(feature = "data")]
pub mod models;
#[cfg(feature = "data")]
pub mod pipeline;
#[cfg(feature = "data")]
pub mod repository;
#[cfg(feature = "db")]
pub mod schema;
#[cfg(feature = "data")]
pub mod services;
