//! Maps one raw deal record into a [`NormalizedDeal`].

use std::sync::LazyLock;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::domain::dashboard::DashboardType;
use crate::domain::deal::{
    DealField, MAX_PRODUCT_MIX, MetricFlags, NormalizedDeal, Product, ProductMixEntry,
    ProductProfits, ProcessingMetadata, RawDeal, SplitCredit,
};
use crate::domain::role::UserRole;
use crate::domain::types::{DealId, SalespersonId, TypeConstraintError};
use crate::pipeline::validators::{
    FieldError, NumberBounds, StringRules, Validated, check_bool, check_date, check_deal_status,
    check_deal_type, check_id, check_number, check_string, check_vehicle_type, clamp_currency,
};

static VIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[A-HJ-NPR-Z0-9]{1,17}$").expect("valid VIN pattern"));

static STOCK_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9\-]+$").expect("valid stock number pattern"));

const NAME_RULES: StringRules<'static> = StringRules::max(100);
const VEHICLE_RULES: StringRules<'static> = StringRules::max(200);
const NOTES_RULES: StringRules<'static> = StringRules::max(500);

/// A substitution made while mapping a deal, reported by [`map_deal_strict`].
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{field}: {error}")]
pub struct FieldIssue {
    pub field: &'static str,
    pub error: FieldError,
}

/// Call-site context for mapping.
#[derive(Debug, Clone)]
pub struct MapOptions {
    pub dashboard_type: DashboardType,
    pub role: Option<UserRole>,
    /// Salesperson the split credit is attributed to; `None` means the whole
    /// deal is credited (manager views).
    pub target_salesperson: Option<SalespersonId>,
    pub now: DateTime<Utc>,
}

impl MapOptions {
    pub fn new(dashboard_type: DashboardType) -> Self {
        Self {
            dashboard_type,
            role: None,
            target_salesperson: None,
            now: Utc::now(),
        }
    }

    pub fn role(mut self, role: UserRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn target(mut self, salesperson: SalespersonId) -> Self {
        self.target_salesperson = Some(salesperson);
        self
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

/// Reads canonical fields off a raw record, remembering every substitution.
struct FieldReader<'a> {
    raw: &'a RawDeal,
    issues: Vec<FieldIssue>,
}

impl<'a> FieldReader<'a> {
    fn new(raw: &'a RawDeal) -> Self {
        Self {
            raw,
            issues: Vec::new(),
        }
    }

    fn value(&self, field: DealField) -> Option<&'a Value> {
        self.raw.field(field)
    }

    fn take<T>(&mut self, field: DealField, checked: Validated<T>) -> T {
        if let Some(error) = checked.issue {
            self.issues.push(FieldIssue {
                field: field.name(),
                error,
            });
        }
        checked.value
    }

    fn text(&mut self, field: DealField, rules: &StringRules<'_>) -> String {
        let checked = check_string(self.value(field), rules);
        self.take(field, checked)
    }

    fn currency(&mut self, field: DealField) -> f64 {
        let checked = check_number(self.value(field), &NumberBounds::CURRENCY);
        self.take(field, checked)
    }

    fn flag(&mut self, field: DealField, default: bool) -> bool {
        let checked = check_bool(self.value(field), default);
        self.take(field, checked)
    }

    fn id<T>(&mut self, field: DealField) -> Option<T>
    where
        T: TryFrom<String, Error = TypeConstraintError>,
    {
        let checked = check_id::<T>(self.value(field));
        self.take(field, checked)
    }
}

/// Works out how much of a deal belongs to `target`.
///
/// Without a target the whole deal is credited. A split flag without a
/// distinct secondary salesperson is treated as a solo deal.
pub fn calculate_split_credit(
    primary: Option<&SalespersonId>,
    secondary: Option<&SalespersonId>,
    is_split: bool,
    target: Option<&SalespersonId>,
) -> SplitCredit {
    let partner = secondary.filter(|secondary| is_split && Some(*secondary) != primary);

    let Some(target) = target else {
        return SplitCredit {
            has_credit: true,
            credit_percentage: 100,
            split_with: partner.cloned(),
        };
    };

    match partner {
        None if primary == Some(target) => SplitCredit {
            has_credit: true,
            credit_percentage: 100,
            split_with: None,
        },
        None => SplitCredit::none(),
        Some(partner) if primary == Some(target) => SplitCredit {
            has_credit: true,
            credit_percentage: 50,
            split_with: Some(partner.clone()),
        },
        Some(partner) if partner == target => SplitCredit {
            has_credit: true,
            credit_percentage: 50,
            split_with: primary.cloned(),
        },
        Some(_) => SplitCredit::none(),
    }
}

/// Re-attributes split credit to `target` and recomputes the adjusted gross.
pub fn attribute_credit(deal: &mut NormalizedDeal, target: Option<&SalespersonId>) {
    deal.split_credit = calculate_split_credit(
        deal.primary_salesperson_id.as_ref(),
        deal.secondary_salesperson_id.as_ref(),
        deal.is_split_deal,
        target,
    );
    let multiplier = deal.split_credit.multiplier();
    deal.adjusted_front_end_gross = clamp_currency(deal.front_end_gross * multiplier);
    deal.adjusted_back_end_gross = clamp_currency(deal.back_end_gross * multiplier);
    deal.adjusted_total_gross = clamp_currency(deal.total_gross * multiplier);
}

/// Products with positive profit, in catalogue order.
pub fn product_mix(products: &ProductProfits) -> Vec<ProductMixEntry> {
    Product::ALL
        .iter()
        .filter_map(|&product| {
            let profit = products.get(product);
            (profit > 0.0).then_some(ProductMixEntry { product, profit })
        })
        .take(MAX_PRODUCT_MIX)
        .collect()
}

/// Maps a record that is already known to be a JSON object.
///
/// Returns the deal together with every substitution the validators made.
pub fn map_raw_deal(raw: &RawDeal, options: &MapOptions) -> (NormalizedDeal, Vec<FieldIssue>) {
    let started = Instant::now();
    let mut reader = FieldReader::new(raw);

    let id = reader
        .id::<DealId>(DealField::Id)
        .unwrap_or_else(|| DealId::generate(options.now));

    let customer_name = reader.text(DealField::CustomerName, &NAME_RULES);
    let vehicle = reader.text(DealField::Vehicle, &VEHICLE_RULES);
    let vin = reader
        .text(DealField::Vin, &StringRules::max(17).whitelist(&VIN_RE))
        .to_uppercase();
    let stock_number = reader.text(
        DealField::StockNumber,
        &StringRules::max(20).whitelist(&STOCK_NUMBER_RE),
    );
    let lender = reader.text(DealField::Lender, &NAME_RULES);
    let salesperson_name = reader.text(DealField::SalespersonName, &NAME_RULES);
    let finance_manager_name = reader.text(DealField::FinanceManagerName, &NAME_RULES);
    let notes = reader.text(DealField::Notes, &NOTES_RULES);

    let checked = check_vehicle_type(reader.value(DealField::VehicleType));
    let vehicle_type = reader.take(DealField::VehicleType, checked);
    let checked = check_deal_type(reader.value(DealField::DealType));
    let deal_type = reader.take(DealField::DealType, checked);
    let checked = check_deal_status(reader.value(DealField::DealStatus));
    let deal_status = reader.take(DealField::DealStatus, checked);
    let checked = check_date(reader.value(DealField::DealDate), options.today());
    let deal_date = reader.take(DealField::DealDate, checked);

    let front_end_gross = reader.currency(DealField::FrontEndGross);
    let back_end_gross = reader.currency(DealField::BackEndGross);
    let reserve_flat = reader.currency(DealField::ReserveFlat);
    let mut products = ProductProfits::default();
    for product in Product::ALL {
        let profit = reader.currency(product.field());
        products.set(product, profit);
    }

    let primary_salesperson_id = reader.id::<SalespersonId>(DealField::PrimarySalespersonId);
    let secondary_salesperson_id = reader.id::<SalespersonId>(DealField::SecondarySalespersonId);
    let finance_manager_id = reader.id(DealField::FinanceManagerId);
    let split_requested = reader.flag(DealField::IsSplitDeal, false);
    let is_active = reader.flag(DealField::IsActive, true);

    let is_split_deal = split_requested
        && secondary_salesperson_id.is_some()
        && secondary_salesperson_id != primary_salesperson_id;
    if split_requested && !is_split_deal {
        log::warn!("Deal {id} is flagged as split without a distinct second salesperson");
        reader.issues.push(FieldIssue {
            field: DealField::IsSplitDeal.name(),
            error: FieldError::Constraint(TypeConstraintError::InvalidValue(
                "split deal needs a distinct secondary salesperson".to_string(),
            )),
        });
    }

    let mut deal = NormalizedDeal {
        id,
        customer_name,
        vehicle,
        vin,
        stock_number,
        vehicle_type,
        vehicle_type_display: vehicle_type.display_name().to_string(),
        deal_type,
        deal_status,
        deal_date,
        lender,
        salesperson_name,
        finance_manager_name,
        notes,
        front_end_gross,
        back_end_gross,
        total_gross: clamp_currency(front_end_gross + back_end_gross),
        reserve_flat,
        product_mix: product_mix(&products),
        products,
        primary_salesperson_id,
        secondary_salesperson_id,
        finance_manager_id,
        is_split_deal,
        is_active,
        split_credit: SplitCredit::none(),
        adjusted_front_end_gross: 0.0,
        adjusted_back_end_gross: 0.0,
        adjusted_total_gross: 0.0,
        metric_flags: MetricFlags::from(deal_status),
        processing: ProcessingMetadata {
            processed_at: options.now,
            processing_time_micros: 0,
            dashboard_type: options.dashboard_type,
            role: options.role,
            security_validated: true,
            error: None,
        },
    };
    attribute_credit(&mut deal, options.target_salesperson.as_ref());

    deal.processing.processing_time_micros =
        u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    (deal, reader.issues)
}

/// Maps one untrusted record. Never fails: non-object input yields an
/// inactive stub excluded from metrics.
pub fn map_deal_data(raw: &Value, options: &MapOptions) -> NormalizedDeal {
    match RawDeal::try_from(raw.clone()) {
        Ok(raw) => {
            let (deal, issues) = map_raw_deal(&raw, options);
            if !issues.is_empty() {
                log::debug!("Deal {} mapped with {} substitutions", deal.id, issues.len());
            }
            deal
        }
        Err(other) => {
            log::error!("Deal record is not an object: {other}");
            NormalizedDeal::error_stub(
                DealId::generate(options.now),
                options.dashboard_type,
                options.role,
                "deal record is not an object",
                options.now,
            )
        }
    }
}

/// Maps one record, refusing it if any field had to be substituted.
pub fn map_deal_strict(
    raw: &Value,
    options: &MapOptions,
) -> Result<NormalizedDeal, Vec<FieldIssue>> {
    let raw = RawDeal::try_from(raw.clone()).map_err(|_| {
        vec![FieldIssue {
            field: "deal",
            error: FieldError::UnexpectedType("non-object"),
        }]
    })?;
    let (deal, issues) = map_raw_deal(&raw, options);
    if issues.is_empty() {
        Ok(deal)
    } else {
        Err(issues)
    }
}

/// Maps a batch; every record yields exactly one normalized deal.
pub fn map_deals(raws: &[RawDeal], options: &MapOptions) -> Vec<NormalizedDeal> {
    raws.iter()
        .map(|raw| map_raw_deal(raw, options).0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{DealStatus, VehicleType};
    use crate::pipeline::validators::MAX_CURRENCY;
    use chrono::TimeZone;
    use serde_json::json;

    fn options() -> MapOptions {
        MapOptions::new(DashboardType::Sales)
            .at(Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap())
    }

    fn sp(id: &str) -> SalespersonId {
        SalespersonId::new(id).unwrap()
    }

    fn well_formed() -> Value {
        json!({
            "id": "D-100",
            "customer": "Jane Doe",
            "vehicle": "2024 Civic EX",
            "vin": "1hgcm82633a004352",
            "stockNumber": "A1234",
            "vehicleType": "new",
            "dealType": "lease",
            "status": "funded",
            "saleDate": "2025-06-01",
            "frontEndGross": "1,500.25",
            "profit": 2200,
            "vscProfit": 900,
            "gapProfit": 0,
            "ppmProfit": "350",
            "primarySalespersonId": "sp-1",
            "secondarySalespersonId": "sp-2",
            "isSplitDeal": true,
            "financeManagerId": "fm-1",
        })
    }

    #[test]
    fn maps_aliases_into_canonical_fields() {
        let deal = map_deal_data(&well_formed(), &options());

        assert_eq!(deal.id.as_str(), "D-100");
        assert_eq!(deal.customer_name, "Jane Doe");
        assert_eq!(deal.vin, "1HGCM82633A004352");
        assert_eq!(deal.vehicle_type, VehicleType::New);
        assert_eq!(deal.vehicle_type_display, "New");
        assert_eq!(deal.deal_status, DealStatus::Funded);
        assert_eq!(deal.deal_date, NaiveDate::from_ymd_opt(2025, 6, 1));
        assert_eq!(deal.front_end_gross, 1500.25);
        assert_eq!(deal.back_end_gross, 2200.0);
        assert_eq!(deal.total_gross, 3700.25);
        assert!(deal.is_split_deal);
        assert!(deal.processing.security_validated);
    }

    #[test]
    fn product_mix_keeps_only_positive_profits() {
        let deal = map_deal_data(&well_formed(), &options());
        let products: Vec<Product> = deal.product_mix.iter().map(|e| e.product).collect();
        assert_eq!(products, vec![Product::Vsc, Product::Ppm]);
        assert!(deal.product_mix.len() <= MAX_PRODUCT_MIX);
    }

    #[test]
    fn bogus_values_fall_back_to_defaults() {
        let raw = json!({
            "frontEndGross": "1,000,000",
            "vehicleType": "x",
            "status": "bogus",
        });
        let deal = map_deal_data(&raw, &options());

        assert_eq!(deal.front_end_gross, MAX_CURRENCY);
        assert_eq!(deal.vehicle_type, VehicleType::Used);
        assert_eq!(deal.deal_status, DealStatus::Pending);
        assert!(deal.id.starts_with("deal_"));
    }

    #[test]
    fn strict_mapping_reports_every_substitution() {
        let raw = json!({
            "id": "D-1",
            "frontEndGross": "1,000,000",
            "vehicleType": "x",
            "status": "bogus",
            "customer": "<script>x</script>",
        });
        let issues = map_deal_strict(&raw, &options()).unwrap_err();
        let fields: Vec<&str> = issues.iter().map(|i| i.field).collect();

        assert!(fields.contains(&"frontEndGross"));
        assert!(fields.contains(&"vehicleType"));
        assert!(fields.contains(&"dealStatus"));
        assert!(fields.contains(&"customerName"));
        assert!(map_deal_strict(&well_formed(), &options()).is_ok());
    }

    #[test]
    fn non_object_input_yields_excluded_stub() {
        let deal = map_deal_data(&json!("not a deal"), &options());

        assert!(!deal.is_active);
        assert_eq!(deal.deal_status, DealStatus::DeadDeal);
        assert!(deal.metric_flags.exclude_from_metrics);
        assert!(!deal.processing.security_validated);
        assert!(deal.processing.error.is_some());
    }

    #[test]
    fn solo_deal_credits_the_primary_salesperson() {
        let credit = calculate_split_credit(Some(&sp("a")), None, false, Some(&sp("a")));
        assert!(credit.has_credit);
        assert_eq!(credit.credit_percentage, 100);

        let credit = calculate_split_credit(Some(&sp("a")), None, false, Some(&sp("b")));
        assert_eq!(credit, SplitCredit::none());
    }

    #[test]
    fn split_deal_credits_half_to_either_party() {
        let credit = calculate_split_credit(Some(&sp("a")), Some(&sp("b")), true, Some(&sp("b")));
        assert_eq!(credit.credit_percentage, 50);
        assert_eq!(credit.split_with, Some(sp("a")));

        let credit = calculate_split_credit(Some(&sp("a")), Some(&sp("b")), true, Some(&sp("c")));
        assert!(!credit.has_credit);
        assert_eq!(credit.credit_percentage, 0);
    }

    #[test]
    fn adjusted_gross_applies_credit_share() {
        let options = options().target(sp("sp-2"));
        let deal = map_deal_data(&well_formed(), &options);

        assert_eq!(deal.split_credit.credit_percentage, 50);
        assert_eq!(deal.adjusted_back_end_gross, 1100.0);
        assert_eq!(deal.back_end_gross, 2200.0);
        assert_eq!(deal.adjusted_total_gross, 1850.13);
    }

    #[test]
    fn split_flag_without_partner_is_solo() {
        let raw = json!({"primarySalespersonId": "a", "isSplitDeal": true});
        let deal = map_deal_data(&raw, &options().target(sp("a")));
        assert!(!deal.is_split_deal);
        assert_eq!(deal.split_credit.credit_percentage, 100);
    }

    #[test]
    fn remapping_canonical_output_is_stable() {
        let options = options().target(sp("sp-1"));
        let first = map_deal_data(&well_formed(), &options);
        let reparsed = serde_json::to_value(&first).unwrap();
        let second = map_deal_data(&reparsed, &options);

        assert_eq!(second.id, first.id);
        assert_eq!(second.customer_name, first.customer_name);
        assert_eq!(second.vin, first.vin);
        assert_eq!(second.vehicle_type, first.vehicle_type);
        assert_eq!(second.deal_type, first.deal_type);
        assert_eq!(second.deal_status, first.deal_status);
        assert_eq!(second.deal_date, first.deal_date);
        assert_eq!(second.front_end_gross, first.front_end_gross);
        assert_eq!(second.back_end_gross, first.back_end_gross);
        assert_eq!(second.products, first.products);
        assert_eq!(second.product_mix, first.product_mix);
        assert_eq!(second.split_credit, first.split_credit);
        assert_eq!(second.adjusted_total_gross, first.adjusted_total_gross);
        assert_eq!(second.metric_flags, first.metric_flags);
        assert!(map_deal_strict(&reparsed, &options).is_ok());
    }
}
