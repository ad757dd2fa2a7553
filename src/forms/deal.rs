use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::deal::RawDeal;
use crate::forms::FormError;

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
/// Deal submitted by a salesperson or finance manager.
///
/// Only shape and bounds are checked here; field-level sanitization happens
/// when the deal is mapped.
pub struct LogDealForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 50))]
    pub id: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub customer_name: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub vehicle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 17))]
    pub vin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 20))]
    pub stock_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub lender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub notes: Option<String>,

    #[serde(default)]
    #[validate(range(min = -999_999.99, max = 999_999.99))]
    pub front_end_gross: f64,
    #[serde(default)]
    #[validate(range(min = -999_999.99, max = 999_999.99))]
    pub back_end_gross: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = -999_999.99, max = 999_999.99))]
    pub reserve_flat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 999_999.99))]
    pub vsc_profit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 999_999.99))]
    pub gap_profit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 999_999.99))]
    pub ppm_profit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 999_999.99))]
    pub tire_wheel_profit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 999_999.99))]
    pub appearance_profit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 999_999.99))]
    pub theft_profit: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_salesperson_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_salesperson_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finance_manager_id: Option<String>,
    #[serde(default)]
    pub is_split_deal: bool,
}

impl LogDealForm {
    /// Converts the form into an untrusted record for the mapper.
    pub fn into_raw_deal(self) -> Result<RawDeal, FormError> {
        let value =
            serde_json::to_value(self).map_err(|err| FormError::Malformed(err.to_string()))?;
        RawDeal::try_from(value)
            .map_err(|other| FormError::Malformed(format!("expected an object, got {other}")))
    }
}
