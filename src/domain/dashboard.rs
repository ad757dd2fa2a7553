//! Dashboard kinds and reporting windows.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::types::TypeConstraintError;

/// Dashboards served by the facade, one storage key each.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DashboardType {
    Sales,
    Finance,
    SalesManager,
    GeneralManager,
}

impl DashboardType {
    pub const ALL: [DashboardType; 4] = [
        DashboardType::Sales,
        DashboardType::Finance,
        DashboardType::SalesManager,
        DashboardType::GeneralManager,
    ];

    /// Key under which the dashboard's deal log is persisted.
    pub const fn storage_key(self) -> &'static str {
        match self {
            DashboardType::Sales => "sales_deals",
            DashboardType::Finance => "finance_deals",
            DashboardType::SalesManager => "sales_manager_deals",
            DashboardType::GeneralManager => "general_manager_deals",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DashboardType::Sales => "sales",
            DashboardType::Finance => "finance",
            DashboardType::SalesManager => "sales-manager",
            DashboardType::GeneralManager => "general-manager",
        }
    }
}

impl Display for DashboardType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DashboardType {
    type Err = TypeConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "sales" | "salesperson" => Ok(DashboardType::Sales),
            "finance" => Ok(DashboardType::Finance),
            "sales-manager" => Ok(DashboardType::SalesManager),
            "general-manager" | "gm" => Ok(DashboardType::GeneralManager),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "unknown dashboard type: {other}"
            ))),
        }
    }
}

/// Reporting window applied by the aggregator, relative to the call date.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TimePeriod {
    #[default]
    ThisMonth,
    LastMonth,
    YearToDate,
    LastYear,
    AllTime,
}

impl TimePeriod {
    /// Half-open `[start, end)` date range, or `None` for [`TimePeriod::AllTime`].
    pub fn bounds(self, as_of: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let month_start = as_of.with_day(1)?;
        let year_start = NaiveDate::from_ymd_opt(as_of.year(), 1, 1)?;
        match self {
            TimePeriod::ThisMonth => {
                Some((month_start, month_start.checked_add_months(Months::new(1))?))
            }
            TimePeriod::LastMonth => {
                Some((month_start.checked_sub_months(Months::new(1))?, month_start))
            }
            TimePeriod::YearToDate => Some((year_start, as_of.succ_opt()?)),
            TimePeriod::LastYear => {
                Some((year_start.checked_sub_months(Months::new(12))?, year_start))
            }
            TimePeriod::AllTime => None,
        }
    }

    /// Whether a deal dated `date` falls inside the window. Undated deals only
    /// belong to [`TimePeriod::AllTime`].
    pub fn contains(self, date: Option<NaiveDate>, as_of: NaiveDate) -> bool {
        match (self.bounds(as_of), date) {
            (None, _) => self == TimePeriod::AllTime,
            (Some(_), None) => false,
            (Some((start, end)), Some(date)) => date >= start && date < end,
        }
    }
}

impl FromStr for TimePeriod {
    type Err = TypeConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "this-month" | "month" => Ok(TimePeriod::ThisMonth),
            "last-month" => Ok(TimePeriod::LastMonth),
            "year-to-date" | "ytd" => Ok(TimePeriod::YearToDate),
            "last-year" => Ok(TimePeriod::LastYear),
            "all-time" | "all" => Ok(TimePeriod::AllTime),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "unknown time period: {other}"
            ))),
        }
    }
}
