//! Dealership roles, the session user, and the role routing table.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::dashboard::DashboardType;
use crate::domain::types::{TypeConstraintError, UserId};

/// Where users without a recognised role are sent.
pub const SIGNIN_PATH: &str = "/auth/signin";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Salesperson,
    FinanceManager,
    SalesManager,
    GeneralManager,
    Admin,
}

impl UserRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            UserRole::Salesperson => "salesperson",
            UserRole::FinanceManager => "finance_manager",
            UserRole::SalesManager => "sales_manager",
            UserRole::GeneralManager => "general_manager",
            UserRole::Admin => "admin",
        }
    }

    /// Landing page after sign-in.
    pub const fn dashboard_path(self) -> &'static str {
        match self {
            UserRole::Salesperson => "/dashboard/sales",
            UserRole::FinanceManager => "/dashboard/finance",
            UserRole::SalesManager => "/dashboard/sales-manager",
            UserRole::GeneralManager | UserRole::Admin => "/dashboard/general-manager",
        }
    }

    pub const fn default_dashboard(self) -> DashboardType {
        match self {
            UserRole::Salesperson => DashboardType::Sales,
            UserRole::FinanceManager => DashboardType::Finance,
            UserRole::SalesManager => DashboardType::SalesManager,
            UserRole::GeneralManager | UserRole::Admin => DashboardType::GeneralManager,
        }
    }

    /// Managers see their own board and everything below it.
    pub const fn can_view(self, dashboard: DashboardType) -> bool {
        match self {
            UserRole::Salesperson => matches!(dashboard, DashboardType::Sales),
            UserRole::FinanceManager => matches!(dashboard, DashboardType::Finance),
            UserRole::SalesManager => matches!(
                dashboard,
                DashboardType::Sales | DashboardType::SalesManager
            ),
            UserRole::GeneralManager | UserRole::Admin => true,
        }
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = TypeConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "salesperson" | "sales" => Ok(UserRole::Salesperson),
            "finance_manager" | "finance" => Ok(UserRole::FinanceManager),
            "sales_manager" => Ok(UserRole::SalesManager),
            "general_manager" | "gm" => Ok(UserRole::GeneralManager),
            "admin" => Ok(UserRole::Admin),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "unknown role: {other}"
            ))),
        }
    }
}

/// Resolves the post-login redirect for a role string from the session.
pub fn redirect_path_for(role: Option<&str>) -> &'static str {
    match role.map(str::parse::<UserRole>) {
        Some(Ok(role)) => role.dashboard_path(),
        Some(Err(err)) => {
            log::warn!("Redirecting to sign-in: {err}");
            SIGNIN_PATH
        }
        None => SIGNIN_PATH,
    }
}

/// Session identity handed over by the authentication provider.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub role: UserRole,
    pub dealership_id: String,
}

impl AuthenticatedUser {
    pub fn new(user_id: UserId, role: UserRole, dealership_id: impl Into<String>) -> Self {
        Self {
            user_id,
            role,
            dealership_id: dealership_id.into(),
        }
    }
}
