//! Deal normalization and aggregation.
//!
//! Raw records pass through [`validators`] inside the [`mapper`], and the
//! resulting [`NormalizedDeal`]s are reduced by the [`aggregator`].
//!
//! [`NormalizedDeal`]: crate::domain::deal::NormalizedDeal

pub mod aggregator;
pub mod mapper;
pub mod validators;
