//! Deal entry: validate, throttle, normalize and append to the dashboard log.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value;
use validator::Validate;

use crate::domain::dashboard::DashboardType;
use crate::domain::deal::{DealField, NormalizedDeal};
use crate::domain::role::{AuthenticatedUser, UserRole};
use crate::forms::deal::LogDealForm;
use crate::pipeline::mapper::{FieldIssue, MapOptions, map_deal_strict};
use crate::repository::KeyValueStore;
use crate::repository::storage::DealStorage;
use crate::services::rate_limit::RateLimiter;
use crate::services::{ServiceError, ServiceResult, ensure_dashboard_access};

fn describe(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Same as [`log_deal`] with an explicit clock.
pub fn log_deal_at<S>(
    storage: &DealStorage<S>,
    limiter: &RateLimiter,
    user: &AuthenticatedUser,
    dashboard_type: DashboardType,
    form: LogDealForm,
    now: DateTime<Utc>,
) -> ServiceResult<NormalizedDeal>
where
    S: KeyValueStore,
{
    ensure_dashboard_access(user, dashboard_type)?;

    form.validate()?;

    if !limiter.check(user.user_id.as_str(), Instant::now()) {
        return Err(ServiceError::RateLimited);
    }

    let mut raw = form.into_raw_deal()?;
    match user.role {
        UserRole::Salesperson if raw.field(DealField::PrimarySalespersonId).is_none() => {
            raw.insert(
                DealField::PrimarySalespersonId.name(),
                Value::String(user.user_id.to_string()),
            );
        }
        UserRole::FinanceManager if raw.field(DealField::FinanceManagerId).is_none() => {
            raw.insert(
                DealField::FinanceManagerId.name(),
                Value::String(user.user_id.to_string()),
            );
        }
        _ => {}
    }

    let options = MapOptions::new(dashboard_type).role(user.role).at(now);
    let deal = map_deal_strict(&raw.into_value(), &options).map_err(|issues| {
        log::warn!(
            "Rejected deal from user {}: {}",
            user.user_id,
            describe(&issues)
        );
        ServiceError::Form(describe(&issues))
    })?;

    let key = dashboard_type.storage_key();
    let stored = storage.append(key, &deal).map_err(|err| {
        log::error!("Failed to append deal {} to {key}: {err}", deal.id);
        err
    })?;
    log::info!("Logged deal {} under {key} ({stored} stored)", deal.id);

    Ok(deal)
}

/// Records a new deal on `dashboard_type` for `user`.
///
/// Unlike dashboard reads this refuses any value that would need
/// substituting, so stored deals are exactly what was submitted.
pub fn log_deal<S>(
    storage: &DealStorage<S>,
    limiter: &RateLimiter,
    user: &AuthenticatedUser,
    dashboard_type: DashboardType,
    form: LogDealForm,
) -> ServiceResult<NormalizedDeal>
where
    S: KeyValueStore,
{
    log_deal_at(storage, limiter, user, dashboard_type, form, Utc::now())
}
