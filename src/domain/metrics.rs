//! Dashboard metrics computed on demand from a filtered deal collection.

use serde::{Deserialize, Serialize};

use crate::domain::deal::Product;

/// Share of counted deals that sold a given product.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductPenetration {
    pub product: Product,
    pub deals: usize,
    pub percentage: f64,
    pub total_profit: f64,
}

/// Aggregate figures shown on a dashboard. Never persisted.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    /// Deals that count toward metrics (not unwound or dead).
    pub total_deals: usize,
    /// Units credited to the viewer; split deals count as half.
    pub credited_units: f64,
    pub new_vehicles: usize,
    pub used_vehicles: usize,
    pub certified_vehicles: usize,
    pub funded_deals: usize,
    pub pending_deals: usize,
    pub unwound_deals: usize,
    pub dead_deals: usize,
    pub total_front_end_gross: f64,
    pub total_back_end_gross: f64,
    pub total_gross: f64,
    pub average_front_end_gross: f64,
    pub average_back_end_gross: f64,
    /// Total gross per credited unit.
    pub pvr: f64,
    /// Back-end (F&I) gross per credited unit.
    pub back_end_pvr: f64,
    pub total_products: usize,
    pub products_per_deal: f64,
    pub funded_percentage: f64,
    pub product_penetration: Vec<ProductPenetration>,
}

impl DashboardMetrics {
    /// All-zero metrics returned for empty collections and fallbacks.
    pub fn zeroed() -> Self {
        Self::default()
    }
}
