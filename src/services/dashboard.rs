//! Dashboard data facade: storage, mapping and aggregation behind one call.

use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::domain::dashboard::DashboardType;
use crate::domain::role::{AuthenticatedUser, UserRole};
use crate::domain::types::{FinanceManagerId, SalespersonId};
use crate::dto::dashboard::{DashboardData, DashboardQuery};
use crate::pipeline::aggregator::{AggregatedDeals, AggregationFilters, aggregate_deals};
use crate::pipeline::mapper::{MapOptions, map_deals};
use crate::repository::KeyValueStore;
use crate::repository::storage::DealStorage;
use crate::services::{ServiceResult, ensure_dashboard_access};

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Mapping and filtering options for `user` on `dashboard_type`.
///
/// Salespeople are pinned to their own id whatever the query says.
fn scope_for(
    user: &AuthenticatedUser,
    dashboard_type: DashboardType,
    query: &DashboardQuery,
    now: DateTime<Utc>,
) -> (MapOptions, AggregationFilters) {
    let mut options = MapOptions::new(dashboard_type).role(user.role).at(now);
    let mut filters = AggregationFilters::new(query.time_period)
        .as_of(query.as_of.unwrap_or_else(|| now.date_naive()));
    if query.include_inactive {
        filters = filters.include_inactive();
    }

    let salesperson = match user.role {
        UserRole::Salesperson => Some(SalespersonId::from(&user.user_id)),
        _ => query.salesperson_id.clone(),
    };
    if let Some(salesperson) = salesperson {
        options = options.target(salesperson.clone());
        filters = filters.salesperson(salesperson);
    }

    let finance_manager = match (user.role, dashboard_type) {
        (UserRole::FinanceManager, DashboardType::Finance) => Some(
            query
                .finance_manager_id
                .clone()
                .unwrap_or_else(|| FinanceManagerId::from(&user.user_id)),
        ),
        _ => query.finance_manager_id.clone(),
    };
    if let Some(finance_manager) = finance_manager {
        filters = filters.finance_manager(finance_manager);
    }

    (options, filters)
}

fn build_dashboard<S>(
    storage: &DealStorage<S>,
    user: &AuthenticatedUser,
    dashboard_type: DashboardType,
    query: &DashboardQuery,
    now: DateTime<Utc>,
) -> ServiceResult<AggregatedDeals>
where
    S: KeyValueStore,
{
    ensure_dashboard_access(user, dashboard_type)?;

    let key = dashboard_type.storage_key();
    let raws = storage.try_load(key).map_err(|err| {
        log::error!("Failed to load deals from {key}: {err}");
        err
    })?;

    let (options, filters) = scope_for(user, dashboard_type, query, now);
    let deals = map_deals(&raws, &options);
    log::debug!(
        "Mapped {} deals for the {dashboard_type} dashboard of user {}",
        deals.len(),
        user.user_id
    );

    Ok(aggregate_deals(&deals, &filters))
}

/// Same as [`get_dashboard_data`] with an explicit clock.
pub fn get_dashboard_data_at<S>(
    storage: &DealStorage<S>,
    user: &AuthenticatedUser,
    dashboard_type: DashboardType,
    query: &DashboardQuery,
    now: DateTime<Utc>,
) -> DashboardData
where
    S: KeyValueStore,
{
    let started = Instant::now();

    match build_dashboard(storage, user, dashboard_type, query, now) {
        Ok(AggregatedDeals { deals, metrics }) => DashboardData {
            dashboard_type,
            deals,
            metrics,
            processing_time_ms: elapsed_ms(started),
            last_updated: now,
            error: None,
            security_validated: true,
        },
        Err(err) => {
            log::error!(
                "Falling back to an empty {dashboard_type} dashboard for user {}: {err}",
                user.user_id
            );
            DashboardData::fallback(dashboard_type, err.to_string(), elapsed_ms(started), now)
        }
    }
}

/// Loads, normalizes and aggregates the deals behind `dashboard_type`.
///
/// Never fails. Any problem yields a zeroed envelope with `error` set and
/// `security_validated` cleared.
pub fn get_dashboard_data<S>(
    storage: &DealStorage<S>,
    user: &AuthenticatedUser,
    dashboard_type: DashboardType,
    query: &DashboardQuery,
) -> DashboardData
where
    S: KeyValueStore,
{
    get_dashboard_data_at(storage, user, dashboard_type, query, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dashboard::TimePeriod;
    use crate::domain::types::UserId;
    use crate::repository::memory::InMemoryStore;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn user(id: &str, role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new(id).unwrap(), role, "dealer-1")
    }

    fn seeded_storage(key: &str) -> DealStorage<InMemoryStore> {
        let storage = DealStorage::new(InMemoryStore::new());
        let deals = vec![
            json!({
                "id": "d-1",
                "customerName": "Solo Buyer",
                "dealDate": "2025-06-10",
                "dealStatus": "Funded",
                "frontEndGross": 1000,
                "backEndGross": 500,
                "primarySalespersonId": "sp-1",
                "financeManagerId": "fm-1",
            }),
            json!({
                "id": "d-2",
                "customerName": "Split Buyer",
                "dealDate": "2025-06-11",
                "frontEndGross": 2000,
                "backEndGross": 1000,
                "primarySalespersonId": "sp-2",
                "secondarySalespersonId": "sp-1",
                "isSplitDeal": true,
                "financeManagerId": "fm-2",
            }),
            json!({
                "id": "d-3",
                "customerName": "Other Buyer",
                "dealDate": "2025-06-12",
                "frontEndGross": 700,
                "primarySalespersonId": "sp-3",
                "financeManagerId": "fm-1",
            }),
        ];
        storage.save(key, &deals).unwrap();
        storage
    }

    fn query() -> DashboardQuery {
        DashboardQuery {
            as_of: NaiveDate::from_ymd_opt(2025, 6, 15),
            ..DashboardQuery::new(TimePeriod::ThisMonth)
        }
    }

    #[test]
    fn salesperson_sees_only_credited_deals() {
        let storage = seeded_storage("sales_deals");
        let mut query = query();
        query.salesperson_id = Some(SalespersonId::new("sp-3").unwrap());

        let data = get_dashboard_data_at(
            &storage,
            &user("sp-1", UserRole::Salesperson),
            DashboardType::Sales,
            &query,
            now(),
        );

        assert!(data.security_validated);
        assert!(data.error.is_none());
        let ids: Vec<&str> = data.deals.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["d-1", "d-2"]);
        assert_eq!(data.deals[1].split_credit.credit_percentage, 50);
        assert_eq!(data.deals[1].adjusted_total_gross, 1500.0);
        assert_eq!(data.metrics.total_deals, 2);
    }

    #[test]
    fn general_manager_sees_everything() {
        let storage = seeded_storage("general_manager_deals");

        let data = get_dashboard_data_at(
            &storage,
            &user("gm-1", UserRole::GeneralManager),
            DashboardType::GeneralManager,
            &query(),
            now(),
        );

        assert_eq!(data.deals.len(), 3);
        assert_eq!(data.metrics.total_front_end_gross, 3700.0);
    }

    #[test]
    fn finance_manager_defaults_to_own_deals() {
        let storage = seeded_storage("finance_deals");

        let data = get_dashboard_data_at(
            &storage,
            &user("fm-1", UserRole::FinanceManager),
            DashboardType::Finance,
            &query(),
            now(),
        );

        let ids: Vec<&str> = data.deals.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["d-1", "d-3"]);
    }

    #[test]
    fn cross_role_read_falls_back() {
        let storage = seeded_storage("general_manager_deals");

        let data = get_dashboard_data_at(
            &storage,
            &user("sp-1", UserRole::Salesperson),
            DashboardType::GeneralManager,
            &query(),
            now(),
        );

        assert!(!data.security_validated);
        assert!(data.deals.is_empty());
        assert_eq!(data.metrics, crate::domain::metrics::DashboardMetrics::zeroed());
        assert!(data.error.is_some());
        assert_eq!(data.last_updated, now());
    }

    #[test]
    fn empty_store_yields_validated_empty_dashboard() {
        let storage = DealStorage::new(InMemoryStore::new());

        let data = get_dashboard_data_at(
            &storage,
            &user("sm-1", UserRole::SalesManager),
            DashboardType::SalesManager,
            &query(),
            now(),
        );

        assert!(data.security_validated);
        assert!(data.deals.is_empty());
        assert_eq!(data.metrics.total_deals, 0);
    }

    #[cfg(feature = "test-mocks")]
    mod mocked {
        use super::*;
        use crate::repository::errors::RepositoryError;
        use crate::repository::mock::MockRepository;

        #[test]
        fn denied_users_never_touch_the_store() {
            let mut repo = MockRepository::new();
            repo.expect_get().times(0);
            let storage = DealStorage::new(&repo);

            let data = get_dashboard_data_at(
                &storage,
                &user("fm-1", UserRole::FinanceManager),
                DashboardType::Sales,
                &query(),
                now(),
            );

            assert_eq!(data.error.as_deref(), Some("Unauthorized"));
        }

        #[test]
        fn store_failure_falls_back() {
            let mut repo = MockRepository::new();
            repo.expect_get()
                .withf(|key| key == "sales_manager_deals")
                .times(1)
                .returning(|_| Err(RepositoryError::ConnectionError("down".to_string())));
            let storage = DealStorage::new(&repo);

            let data = get_dashboard_data_at(
                &storage,
                &user("sm-1", UserRole::SalesManager),
                DashboardType::SalesManager,
                &query(),
                now(),
            );

            assert!(!data.security_validated);
            assert!(data.error.is_some_and(|e| e.contains("down")));
        }

        #[test]
        fn corrupt_payload_falls_back() {
            let mut repo = MockRepository::new();
            repo.expect_get()
                .times(1)
                .returning(|_| Ok(Some("{not json".to_string())));
            let storage = DealStorage::new(&repo);

            let data = get_dashboard_data_at(
                &storage,
                &user("gm-1", UserRole::GeneralManager),
                DashboardType::Sales,
                &query(),
                now(),
            );

            assert!(!data.security_validated);
            assert!(data.deals.is_empty());
        }
    }
}
