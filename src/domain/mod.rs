//! Domain types flowing through the deal pipeline.

pub mod dashboard;
pub mod deal;
pub mod metrics;
pub mod role;
pub mod types;
