use chrono::{NaiveDate, TimeZone, Utc};
use pushkind_deals::domain::dashboard::{DashboardType, TimePeriod};
use pushkind_deals::domain::deal::RawDeal;
use pushkind_deals::domain::types::{DealStatus, SalespersonId, VehicleType};
use pushkind_deals::pipeline::aggregator::{AggregationFilters, aggregate_deals};
use pushkind_deals::pipeline::mapper::{
    MapOptions, calculate_split_credit, map_deal_data, map_deals,
};
use pushkind_deals::pipeline::validators::{
    NumberBounds, StringRules, map_vehicle_type, sanitize_string, validate_number,
};
use serde_json::{Value, json};

fn options() -> MapOptions {
    MapOptions::new(DashboardType::GeneralManager)
        .at(Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap())
}

fn filters(period: TimePeriod) -> AggregationFilters {
    AggregationFilters::new(period).as_of(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap())
}

#[test]
fn test_numbers_are_bounded_and_idempotent() {
    let inputs = [
        json!(12.345),
        json!(-5_000_000),
        json!("1e308"),
        json!("NaN"),
        json!("  42.5 "),
        json!(true),
        json!(null),
        json!("$2,500.75"),
    ];

    for input in inputs {
        let once = validate_number(Some(&input), &NumberBounds::CURRENCY);
        assert!(once.is_finite());
        assert!((-999_999.99..=999_999.99).contains(&once), "{input} -> {once}");
        assert_eq!((once * 100.0).round() / 100.0, once);

        let twice = validate_number(Some(&json!(once)), &NumberBounds::CURRENCY);
        assert_eq!(once, twice);
    }
}

#[test]
fn test_blocked_strings_are_emptied() {
    let rules = StringRules::max(500);
    for text in [
        "<script>alert(1)</script>",
        "click javascript:void(0)",
        "<img onerror=alert(1)>",
        "x onload =run()",
    ] {
        assert_eq!(sanitize_string(Some(&json!(text)), &rules), "");
    }
    assert_eq!(sanitize_string(Some(&json!("Smith & Sons")), &rules), "Smith & Sons");
}

#[test]
fn test_vehicle_type_defaults_to_used() {
    assert_eq!(map_vehicle_type(Some(&json!("N"))), VehicleType::New);
    assert_eq!(map_vehicle_type(Some(&json!("spaceship"))), VehicleType::Used);
    assert_eq!(map_vehicle_type(None), VehicleType::Used);
}

#[test]
fn test_split_credit_rules() {
    let a = SalespersonId::new("a").unwrap();
    let b = SalespersonId::new("b").unwrap();
    let c = SalespersonId::new("c").unwrap();

    let solo = calculate_split_credit(Some(&a), None, false, Some(&a));
    assert!(solo.has_credit);
    assert_eq!(solo.credit_percentage, 100);

    let outsider = calculate_split_credit(Some(&a), Some(&b), true, Some(&c));
    assert!(!outsider.has_credit);
    assert_eq!(outsider.credit_percentage, 0);
}

#[test]
fn test_bogus_record_maps_to_defaults() {
    let deal = map_deal_data(
        &json!({"frontEndGross": "1,000,000", "vehicleType": "x", "status": "bogus"}),
        &options(),
    );

    assert_eq!(deal.front_end_gross, 999_999.99);
    assert_eq!(deal.vehicle_type, VehicleType::Used);
    assert_eq!(deal.deal_status, DealStatus::Pending);
    assert_eq!(
        validate_number(Some(&json!("1,000,000")), &NumberBounds::STRICT_CURRENCY),
        0.0
    );
}

#[test]
fn test_remapping_canonical_output_is_stable() {
    let raw = json!({
        "id": "deal-7",
        "customer": "  Ann <b>Lee</b> ",
        "vin": "1hgcm82633a004352",
        "vehicleType": "certified",
        "status": "funded",
        "date": "06/01/2025",
        "front_end_gross": "1,234.567",
        "profit": 321.1,
        "gap_profit": 200,
        "salespersonId": "sp-1",
        "secondarySalespersonId": "sp-2",
        "isSplitDeal": "yes",
    });

    let first = map_deal_data(&raw, &options());
    let canonical = serde_json::to_value(&first).unwrap();
    let second = map_deal_data(&canonical, &options());

    assert_eq!(first.customer_name, second.customer_name);
    assert_eq!(first.vin, second.vin);
    assert_eq!(first.deal_date, second.deal_date);
    assert_eq!(first.front_end_gross, second.front_end_gross);
    assert_eq!(first.back_end_gross, second.back_end_gross);
    assert_eq!(first.products, second.products);
    assert_eq!(first.split_credit, second.split_credit);
    assert_eq!(first.vehicle_type, second.vehicle_type);
    assert_eq!(first.deal_status, second.deal_status);
}

#[test]
fn test_empty_aggregation_is_zeroed() {
    let result = aggregate_deals(&[], &filters(TimePeriod::ThisMonth));

    assert!(result.deals.is_empty());
    assert_eq!(result.metrics.total_deals, 0);
    assert_eq!(result.metrics.pvr, 0.0);
    assert_eq!(result.metrics.funded_percentage, 0.0);
}

#[test]
fn test_output_is_capped_at_one_hundred() {
    let raws: Vec<RawDeal> = (0..150)
        .map(|i| {
            RawDeal::try_from(json!({
                "id": format!("deal-{i}"),
                "dealDate": "2025-06-01",
                "frontEndGross": 100,
            }))
            .unwrap()
        })
        .collect();
    let deals = map_deals(&raws, &options());
    assert_eq!(deals.len(), 150);

    let result = aggregate_deals(&deals, &filters(TimePeriod::AllTime));

    assert_eq!(result.deals.len(), 100);
    assert!(result.metrics.total_deals <= 100);
}

#[test]
fn test_non_object_records_become_excluded_stubs() {
    let deal = map_deal_data(&Value::String("garbage".into()), &options());

    assert!(!deal.is_active);
    assert!(deal.metric_flags.exclude_from_metrics);
    assert!(deal.processing.error.is_some());
}
