//! Deal records: the untrusted raw shape and the canonical normalized shape.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::dashboard::DashboardType;
use crate::domain::role::UserRole;
use crate::domain::types::{
    DealId, DealStatus, DealType, FinanceManagerId, SalespersonId, VehicleType,
};

/// Maximum number of entries kept in [`NormalizedDeal::product_mix`].
pub const MAX_PRODUCT_MIX: usize = 10;

/// A deal record exactly as it was read from storage or an API response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawDeal(Map<String, Value>);

impl RawDeal {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Returns the first non-null value stored under any alias of `field`.
    pub fn field(&self, field: DealField) -> Option<&Value> {
        field
            .aliases()
            .iter()
            .find_map(|alias| self.0.get(*alias).filter(|value| !value.is_null()))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl TryFrom<Value> for RawDeal {
    type Error = Value;

    /// Only JSON objects are deal records; anything else is handed back.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

impl From<Map<String, Value>> for RawDeal {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

/// Canonical deal fields and the key names they are known by upstream.
///
/// The first alias is always the camelCase name [`NormalizedDeal`] serializes
/// to, so a normalized record reads back as raw input unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DealField {
    Id,
    CustomerName,
    Vehicle,
    Vin,
    StockNumber,
    VehicleType,
    DealType,
    DealStatus,
    DealDate,
    Lender,
    SalespersonName,
    FinanceManagerName,
    Notes,
    FrontEndGross,
    BackEndGross,
    ReserveFlat,
    VscProfit,
    GapProfit,
    PpmProfit,
    TireWheelProfit,
    AppearanceProfit,
    TheftProfit,
    PrimarySalespersonId,
    SecondarySalespersonId,
    FinanceManagerId,
    IsSplitDeal,
    IsActive,
}

impl DealField {
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            DealField::Id => &["id", "dealId", "deal_id", "dealNumber"],
            DealField::CustomerName => &["customerName", "customer_name", "customer"],
            DealField::Vehicle => &["vehicle", "vehicleDescription", "vehicle_description"],
            DealField::Vin => &["vin", "vinNumber", "vin_number"],
            DealField::StockNumber => &["stockNumber", "stock_number", "stockNo"],
            DealField::VehicleType => &["vehicleType", "vehicle_type"],
            DealField::DealType => &["dealType", "deal_type"],
            DealField::DealStatus => &["dealStatus", "deal_status", "status"],
            DealField::DealDate => &["dealDate", "deal_date", "saleDate", "date"],
            DealField::Lender => &["lender", "bank"],
            DealField::SalespersonName => &["salespersonName", "salesperson_name", "salesperson"],
            DealField::FinanceManagerName => {
                &["financeManagerName", "finance_manager_name", "financeManager"]
            }
            DealField::Notes => &["notes", "comments"],
            DealField::FrontEndGross => &["frontEndGross", "front_end_gross", "frontGross"],
            DealField::BackEndGross => &["backEndGross", "back_end_gross", "profit"],
            DealField::ReserveFlat => &["reserveFlat", "reserve_flat", "financeReserve"],
            DealField::VscProfit => &["vscProfit", "vsc_profit"],
            DealField::GapProfit => &["gapProfit", "gap_profit"],
            DealField::PpmProfit => &["ppmProfit", "ppm_profit"],
            DealField::TireWheelProfit => {
                &["tireWheelProfit", "tire_wheel_profit", "tireAndWheelProfit"]
            }
            DealField::AppearanceProfit => &["appearanceProfit", "appearance_profit"],
            DealField::TheftProfit => &["theftProfit", "theft_profit", "lojackProfit"],
            DealField::PrimarySalespersonId => &[
                "primarySalespersonId",
                "primary_salesperson_id",
                "salespersonId",
                "salesperson_id",
            ],
            DealField::SecondarySalespersonId => {
                &["secondarySalespersonId", "secondary_salesperson_id"]
            }
            DealField::FinanceManagerId => &["financeManagerId", "finance_manager_id"],
            DealField::IsSplitDeal => &["isSplitDeal", "is_split_deal", "splitDeal"],
            DealField::IsActive => &["isActive", "is_active"],
        }
    }

    /// Canonical (serialized) name of the field.
    pub const fn name(self) -> &'static str {
        self.aliases()[0]
    }
}

/// F&I products tracked in the product mix.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Product {
    #[serde(rename = "VSC")]
    Vsc,
    #[serde(rename = "GAP")]
    Gap,
    #[serde(rename = "PPM")]
    Ppm,
    #[serde(rename = "Tire & Wheel")]
    TireWheel,
    #[serde(rename = "Appearance")]
    Appearance,
    #[serde(rename = "Theft")]
    Theft,
}

impl Product {
    pub const ALL: [Product; 6] = [
        Product::Vsc,
        Product::Gap,
        Product::Ppm,
        Product::TireWheel,
        Product::Appearance,
        Product::Theft,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Product::Vsc => "VSC",
            Product::Gap => "GAP",
            Product::Ppm => "PPM",
            Product::TireWheel => "Tire & Wheel",
            Product::Appearance => "Appearance",
            Product::Theft => "Theft",
        }
    }

    /// Raw field carrying this product's profit.
    pub const fn field(self) -> DealField {
        match self {
            Product::Vsc => DealField::VscProfit,
            Product::Gap => DealField::GapProfit,
            Product::Ppm => DealField::PpmProfit,
            Product::TireWheel => DealField::TireWheelProfit,
            Product::Appearance => DealField::AppearanceProfit,
            Product::Theft => DealField::TheftProfit,
        }
    }
}

/// Profit per F&I product as recorded on the deal.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductProfits {
    pub vsc_profit: f64,
    pub gap_profit: f64,
    pub ppm_profit: f64,
    pub tire_wheel_profit: f64,
    pub appearance_profit: f64,
    pub theft_profit: f64,
}

impl ProductProfits {
    pub fn get(&self, product: Product) -> f64 {
        match product {
            Product::Vsc => self.vsc_profit,
            Product::Gap => self.gap_profit,
            Product::Ppm => self.ppm_profit,
            Product::TireWheel => self.tire_wheel_profit,
            Product::Appearance => self.appearance_profit,
            Product::Theft => self.theft_profit,
        }
    }

    pub fn set(&mut self, product: Product, profit: f64) {
        match product {
            Product::Vsc => self.vsc_profit = profit,
            Product::Gap => self.gap_profit = profit,
            Product::Ppm => self.ppm_profit = profit,
            Product::TireWheel => self.tire_wheel_profit = profit,
            Product::Appearance => self.appearance_profit = profit,
            Product::Theft => self.theft_profit = profit,
        }
    }
}

/// A product sold on the deal with positive profit.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProductMixEntry {
    pub product: Product,
    pub profit: f64,
}

/// Share of the deal credited to the salesperson the view is built for.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SplitCredit {
    pub has_credit: bool,
    /// One of 0, 50 or 100.
    pub credit_percentage: u8,
    pub split_with: Option<SalespersonId>,
}

impl SplitCredit {
    pub const fn none() -> Self {
        Self {
            has_credit: false,
            credit_percentage: 0,
            split_with: None,
        }
    }

    pub fn multiplier(&self) -> f64 {
        f64::from(self.credit_percentage) / 100.0
    }
}

/// Metric participation derived solely from [`DealStatus`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetricFlags {
    pub is_active_deal: bool,
    pub is_funded: bool,
    pub is_pending: bool,
    pub exclude_from_metrics: bool,
}

impl From<DealStatus> for MetricFlags {
    fn from(status: DealStatus) -> Self {
        let exclude = status.is_excluded_from_metrics();
        Self {
            is_active_deal: !exclude,
            is_funded: status == DealStatus::Funded,
            is_pending: status == DealStatus::Pending,
            exclude_from_metrics: exclude,
        }
    }
}

/// Bookkeeping attached by the mapper.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingMetadata {
    pub processed_at: DateTime<Utc>,
    pub processing_time_micros: u64,
    pub dashboard_type: DashboardType,
    pub role: Option<UserRole>,
    pub security_validated: bool,
    pub error: Option<String>,
}

/// Validated, schema-consistent deal ready for aggregation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedDeal {
    pub id: DealId,
    pub customer_name: String,
    pub vehicle: String,
    pub vin: String,
    pub stock_number: String,
    pub vehicle_type: VehicleType,
    pub vehicle_type_display: String,
    pub deal_type: DealType,
    pub deal_status: DealStatus,
    pub deal_date: Option<NaiveDate>,
    pub lender: String,
    pub salesperson_name: String,
    pub finance_manager_name: String,
    pub notes: String,

    pub front_end_gross: f64,
    pub back_end_gross: f64,
    pub total_gross: f64,
    pub reserve_flat: f64,
    #[serde(flatten)]
    pub products: ProductProfits,

    pub primary_salesperson_id: Option<SalespersonId>,
    pub secondary_salesperson_id: Option<SalespersonId>,
    pub finance_manager_id: Option<FinanceManagerId>,
    pub is_split_deal: bool,
    pub is_active: bool,

    pub product_mix: Vec<ProductMixEntry>,
    pub split_credit: SplitCredit,
    pub adjusted_front_end_gross: f64,
    pub adjusted_back_end_gross: f64,
    pub adjusted_total_gross: f64,
    pub metric_flags: MetricFlags,
    pub processing: ProcessingMetadata,
}

impl NormalizedDeal {
    /// Builds the record returned in place of a deal that could not be mapped.
    ///
    /// The stub is an inactive dead deal, so its flags agree with its status
    /// and it never counts toward any metric.
    pub fn error_stub(
        id: DealId,
        dashboard_type: DashboardType,
        role: Option<UserRole>,
        error: impl Into<String>,
        processed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            customer_name: String::new(),
            vehicle: String::new(),
            vin: String::new(),
            stock_number: String::new(),
            vehicle_type: VehicleType::default(),
            vehicle_type_display: VehicleType::default().display_name().to_string(),
            deal_type: DealType::default(),
            deal_status: DealStatus::DeadDeal,
            deal_date: None,
            lender: String::new(),
            salesperson_name: String::new(),
            finance_manager_name: String::new(),
            notes: String::new(),
            front_end_gross: 0.0,
            back_end_gross: 0.0,
            total_gross: 0.0,
            reserve_flat: 0.0,
            products: ProductProfits::default(),
            primary_salesperson_id: None,
            secondary_salesperson_id: None,
            finance_manager_id: None,
            is_split_deal: false,
            is_active: false,
            product_mix: Vec::new(),
            split_credit: SplitCredit::none(),
            adjusted_front_end_gross: 0.0,
            adjusted_back_end_gross: 0.0,
            adjusted_total_gross: 0.0,
            metric_flags: MetricFlags::from(DealStatus::DeadDeal),
            processing: ProcessingMetadata {
                processed_at,
                processing_time_micros: 0,
                dashboard_type,
                role,
                security_validated: false,
                error: Some(error.into()),
            },
        }
    }

    /// Whether the deal sold at least one unit of `product`.
    pub fn has_product(&self, product: Product) -> bool {
        self.products.get(product) > 0.0
    }
}
