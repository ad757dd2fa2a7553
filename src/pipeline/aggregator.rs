//! Filters normalized deals and reduces them into [`DashboardMetrics`].

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::domain::dashboard::TimePeriod;
use crate::domain::deal::{NormalizedDeal, Product};
use crate::domain::metrics::{DashboardMetrics, ProductPenetration};
use crate::domain::types::{DealStatus, FinanceManagerId, SalespersonId, VehicleType};
use crate::pipeline::mapper::attribute_credit;
use crate::pipeline::validators::clamp_currency;

/// Deals considered per aggregation call; the rest are ignored.
pub const MAX_INPUT_DEALS: usize = 100;

/// Deals returned to the caller alongside the metrics.
pub const MAX_OUTPUT_DEALS: usize = 100;

#[derive(Debug, Clone)]
pub struct AggregationFilters {
    pub time_period: TimePeriod,
    pub include_inactive: bool,
    pub salesperson_id: Option<SalespersonId>,
    pub finance_manager_id: Option<FinanceManagerId>,
    /// Reference date for the time window.
    pub as_of: NaiveDate,
}

impl AggregationFilters {
    pub fn new(time_period: TimePeriod) -> Self {
        Self {
            time_period,
            include_inactive: false,
            salesperson_id: None,
            finance_manager_id: None,
            as_of: Utc::now().date_naive(),
        }
    }

    pub fn include_inactive(mut self) -> Self {
        self.include_inactive = true;
        self
    }

    pub fn salesperson(mut self, id: SalespersonId) -> Self {
        self.salesperson_id = Some(id);
        self
    }

    pub fn finance_manager(mut self, id: FinanceManagerId) -> Self {
        self.finance_manager_id = Some(id);
        self
    }

    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = date;
        self
    }
}

impl Default for AggregationFilters {
    fn default() -> Self {
        Self::new(TimePeriod::default())
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AggregatedDeals {
    pub deals: Vec<NormalizedDeal>,
    pub metrics: DashboardMetrics,
}

/// Applies `filters` in order: inactive exclusion, salesperson credit,
/// finance manager, then time window.
pub fn filter_deals(deals: &[NormalizedDeal], filters: &AggregationFilters) -> Vec<NormalizedDeal> {
    if deals.len() > MAX_INPUT_DEALS {
        log::warn!(
            "Aggregating the first {MAX_INPUT_DEALS} of {} deals",
            deals.len()
        );
    }

    deals
        .iter()
        .take(MAX_INPUT_DEALS)
        .filter(|deal| filters.include_inactive || deal.is_active)
        .filter_map(|deal| match &filters.salesperson_id {
            Some(target) => {
                let mut credited = deal.clone();
                attribute_credit(&mut credited, Some(target));
                credited.split_credit.has_credit.then_some(credited)
            }
            None => Some(deal.clone()),
        })
        .filter(|deal| match &filters.finance_manager_id {
            Some(manager) => deal.finance_manager_id.as_ref() == Some(manager),
            None => true,
        })
        .filter(|deal| filters.time_period.contains(deal.deal_date, filters.as_of))
        .collect()
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Reduces an already filtered collection into dashboard metrics.
pub fn compute_metrics(deals: &[NormalizedDeal]) -> DashboardMetrics {
    let mut metrics = DashboardMetrics::zeroed();
    let mut product_deals = [0usize; Product::ALL.len()];
    let mut product_profit = [0.0f64; Product::ALL.len()];

    for deal in deals {
        match deal.deal_status {
            DealStatus::Pending => metrics.pending_deals += 1,
            DealStatus::Funded => metrics.funded_deals += 1,
            DealStatus::Unwound => metrics.unwound_deals += 1,
            DealStatus::DeadDeal => metrics.dead_deals += 1,
        }

        if deal.metric_flags.exclude_from_metrics {
            continue;
        }

        metrics.total_deals += 1;
        metrics.credited_units += deal.split_credit.multiplier();
        match deal.vehicle_type {
            VehicleType::New => metrics.new_vehicles += 1,
            VehicleType::Used => metrics.used_vehicles += 1,
            VehicleType::Certified => metrics.certified_vehicles += 1,
        }
        metrics.total_front_end_gross += deal.adjusted_front_end_gross;
        metrics.total_back_end_gross += deal.adjusted_back_end_gross;
        metrics.total_gross += deal.adjusted_total_gross;
        metrics.total_products += deal.product_mix.len();

        for (index, product) in Product::ALL.iter().enumerate() {
            if deal.has_product(*product) {
                product_deals[index] += 1;
                product_profit[index] += deal.products.get(*product);
            }
        }
    }

    let counted = metrics.total_deals as f64;
    metrics.credited_units = clamp_currency(metrics.credited_units);
    metrics.total_front_end_gross = clamp_currency(metrics.total_front_end_gross);
    metrics.total_back_end_gross = clamp_currency(metrics.total_back_end_gross);
    metrics.total_gross = clamp_currency(metrics.total_gross);
    metrics.average_front_end_gross =
        clamp_currency(ratio(metrics.total_front_end_gross, metrics.credited_units));
    metrics.average_back_end_gross =
        clamp_currency(ratio(metrics.total_back_end_gross, metrics.credited_units));
    metrics.pvr = clamp_currency(ratio(metrics.total_gross, metrics.credited_units));
    metrics.back_end_pvr = metrics.average_back_end_gross;
    metrics.products_per_deal = clamp_currency(ratio(metrics.total_products as f64, counted));
    metrics.funded_percentage =
        clamp_currency(ratio(metrics.funded_deals as f64, counted) * 100.0);
    metrics.product_penetration = Product::ALL
        .iter()
        .enumerate()
        .map(|(index, &product)| ProductPenetration {
            product,
            deals: product_deals[index],
            percentage: clamp_currency(ratio(product_deals[index] as f64, counted) * 100.0),
            total_profit: clamp_currency(product_profit[index]),
        })
        .collect();

    metrics
}

/// Filters `deals` and computes metrics over what remains.
pub fn aggregate_deals(deals: &[NormalizedDeal], filters: &AggregationFilters) -> AggregatedDeals {
    let mut filtered = filter_deals(deals, filters);
    let metrics = compute_metrics(&filtered);
    filtered.truncate(MAX_OUTPUT_DEALS);

    AggregatedDeals {
        deals: filtered,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dashboard::DashboardType;
    use crate::pipeline::mapper::{MapOptions, map_deal_data};
    use chrono::TimeZone;
    use serde_json::{Value, json};

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn map(raw: Value) -> NormalizedDeal {
        let options = MapOptions::new(DashboardType::GeneralManager)
            .at(Utc.with_ymd_and_hms(2025, 6, 15, 9, 0, 0).unwrap());
        map_deal_data(&raw, &options)
    }

    fn filters(period: TimePeriod) -> AggregationFilters {
        AggregationFilters::new(period).as_of(as_of())
    }

    #[test]
    fn empty_input_yields_zeroed_metrics() {
        let result = aggregate_deals(&[], &filters(TimePeriod::ThisMonth));
        assert!(result.deals.is_empty());
        assert_eq!(result.metrics.total_deals, 0);
        assert_eq!(result.metrics.pvr, 0.0);
        assert_eq!(result.metrics.products_per_deal, 0.0);
        assert!(result.metrics.product_penetration.iter().all(|p| p.percentage == 0.0));
    }

    #[test]
    fn output_is_capped() {
        let deals: Vec<NormalizedDeal> = (0..150)
            .map(|i| {
                map(json!({"id": format!("D{i}"), "dealDate": "2025-06-01", "frontEndGross": 100}))
            })
            .collect();
        let result = aggregate_deals(&deals, &filters(TimePeriod::ThisMonth));
        assert_eq!(result.deals.len(), MAX_OUTPUT_DEALS);
        assert_eq!(result.metrics.total_deals, MAX_INPUT_DEALS);
    }

    #[test]
    fn unwound_and_dead_deals_are_counted_but_not_summed() {
        let deals = vec![
            map(json!({
                "dealDate": "2025-06-02",
                "status": "Funded",
                "frontEndGross": 1000,
                "backEndGross": 500,
                "vscProfit": 400,
            })),
            map(json!({
                "dealDate": "2025-06-03",
                "status": "Pending",
                "frontEndGross": 2000,
                "vehicleType": "N",
            })),
            map(json!({"dealDate": "2025-06-04", "status": "Unwound", "frontEndGross": 9000})),
            map(json!({"dealDate": "2025-06-05", "status": "Dead Deal", "frontEndGross": 9000})),
        ];
        let metrics = aggregate_deals(&deals, &filters(TimePeriod::ThisMonth)).metrics;

        assert_eq!(metrics.total_deals, 2);
        assert_eq!(metrics.unwound_deals, 1);
        assert_eq!(metrics.dead_deals, 1);
        assert_eq!(metrics.funded_deals, 1);
        assert_eq!(metrics.new_vehicles, 1);
        assert_eq!(metrics.used_vehicles, 1);
        assert_eq!(metrics.total_front_end_gross, 3000.0);
        assert_eq!(metrics.total_gross, 3500.0);
        assert_eq!(metrics.pvr, 1750.0);
        assert_eq!(metrics.funded_percentage, 50.0);
        assert_eq!(metrics.products_per_deal, 0.5);
        let vsc = &metrics.product_penetration[0];
        assert_eq!(vsc.product, Product::Vsc);
        assert_eq!(vsc.deals, 1);
        assert_eq!(vsc.percentage, 50.0);
    }

    #[test]
    fn inactive_deals_need_explicit_inclusion() {
        let deals = vec![
            map(json!({"dealDate": "2025-06-02", "isActive": false})),
            map(json!({"dealDate": "2025-06-02"})),
        ];
        assert_eq!(filter_deals(&deals, &filters(TimePeriod::ThisMonth)).len(), 1);
        assert_eq!(
            filter_deals(&deals, &filters(TimePeriod::ThisMonth).include_inactive()).len(),
            2
        );
    }

    #[test]
    fn error_stubs_count_as_dead_not_pending() {
        let stub = map(json!(42));
        let filters = AggregationFilters::new(TimePeriod::AllTime)
            .as_of(as_of())
            .include_inactive();

        let result = aggregate_deals(&[stub], &filters);

        assert_eq!(result.deals.len(), 1);
        assert_eq!(result.metrics.pending_deals, 0);
        assert_eq!(result.metrics.dead_deals, 1);
        assert_eq!(result.metrics.total_deals, 0);
    }

    #[test]
    fn salesperson_filter_reattributes_split_credit() {
        let deals = vec![
            map(json!({
                "dealDate": "2025-06-02",
                "frontEndGross": 1000,
                "primarySalespersonId": "a",
                "secondarySalespersonId": "b",
                "isSplitDeal": true,
            })),
            map(json!({
                "dealDate": "2025-06-02",
                "frontEndGross": 800,
                "primarySalespersonId": "b",
            })),
            map(json!({
                "dealDate": "2025-06-02",
                "frontEndGross": 700,
                "primarySalespersonId": "c",
            })),
        ];
        let target = SalespersonId::new("b").unwrap();
        let result = aggregate_deals(&deals, &filters(TimePeriod::ThisMonth).salesperson(target));

        assert_eq!(result.deals.len(), 2);
        assert_eq!(result.metrics.credited_units, 1.5);
        assert_eq!(result.metrics.total_front_end_gross, 1300.0);
    }

    #[test]
    fn finance_manager_filter_matches_id() {
        let deals = vec![
            map(json!({"dealDate": "2025-06-02", "financeManagerId": "fm-1"})),
            map(json!({"dealDate": "2025-06-02", "financeManagerId": "fm-2"})),
        ];
        let manager = FinanceManagerId::new("fm-1").unwrap();
        let filtered =
            filter_deals(&deals, &filters(TimePeriod::ThisMonth).finance_manager(manager));
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn time_window_filters_by_deal_date() {
        let deals = vec![
            map(json!({"dealDate": "2025-06-02"})),
            map(json!({"dealDate": "2025-05-20"})),
            map(json!({"dealDate": "2024-11-20"})),
            map(json!({})),
        ];
        assert_eq!(filter_deals(&deals, &filters(TimePeriod::ThisMonth)).len(), 1);
        assert_eq!(filter_deals(&deals, &filters(TimePeriod::LastMonth)).len(), 1);
        assert_eq!(filter_deals(&deals, &filters(TimePeriod::YearToDate)).len(), 2);
        assert_eq!(filter_deals(&deals, &filters(TimePeriod::LastYear)).len(), 1);
        assert_eq!(filter_deals(&deals, &filters(TimePeriod::AllTime)).len(), 4);
    }
}
