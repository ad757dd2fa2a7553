//! Strongly-typed value objects used by deal records.
//!
//! These wrappers enforce basic invariants (bounded identifiers, allow-listed
//! categories) so that once a value reaches a [`NormalizedDeal`] it can be
//! treated as trusted.
//!
//! [`NormalizedDeal`]: crate::domain::deal::NormalizedDeal
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Maximum length of any record identifier.
pub const MAX_ID_LEN: usize = 50;

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.:\-]+$").expect("valid identifier pattern"));

/// Errors produced when attempting to construct a constrained value object.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TypeConstraintError {
    /// Provided string contained no non-whitespace characters.
    #[error("value cannot be empty")]
    EmptyString,
    /// Provided identifier exceeded [`MAX_ID_LEN`].
    #[error("identifier longer than 50 characters")]
    IdTooLong,
    /// Provided identifier contained characters outside the allowed set.
    #[error("identifier contains invalid characters")]
    InvalidIdentifier,
    /// Vehicle type was not one of the recognised codes.
    #[error("unknown vehicle type: {0}")]
    UnknownVehicleType(String),
    /// Deal status was not one of the recognised values.
    #[error("unknown deal status: {0}")]
    UnknownDealStatus(String),
    /// Deal type was not one of the recognised values.
    #[error("unknown deal type: {0}")]
    UnknownDealType(String),
    /// Provided value failed custom validation.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Trims and validates an identifier string.
fn normalize_identifier<S: Into<String>>(value: S) -> Result<String, TypeConstraintError> {
    let trimmed = value.into().trim().to_string();
    if trimmed.is_empty() {
        return Err(TypeConstraintError::EmptyString);
    }
    if trimmed.chars().count() > MAX_ID_LEN {
        return Err(TypeConstraintError::IdTooLong);
    }
    if !IDENTIFIER_RE.is_match(&trimmed) {
        return Err(TypeConstraintError::InvalidIdentifier);
    }
    Ok(trimmed)
}

/// Macro to generate lightweight newtypes for bounded string identifiers.
macro_rules! id_newtype {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier ensuring it is non-empty, bounded and
            /// made of identifier characters only.
            pub fn new<S: Into<String>>(value: S) -> Result<Self, TypeConstraintError> {
                normalize_identifier(value).map(Self)
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the owned string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeConstraintError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = TypeConstraintError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

id_newtype!(DealId, "Unique identifier for a deal record.");
id_newtype!(SalespersonId, "Identifier of a salesperson credited on a deal.");
id_newtype!(FinanceManagerId, "Identifier of the F&I manager on a deal.");
id_newtype!(UserId, "Identifier of an authenticated dealership user.");

impl DealId {
    /// Synthesizes a client-side identifier from a timestamp and a random
    /// suffix, e.g. `deal_1718035200000_3f9a0c1b2`.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("deal_{}_{}", now.timestamp_millis(), &suffix[..9]))
    }
}

impl From<&UserId> for SalespersonId {
    fn from(value: &UserId) -> Self {
        Self(value.0.clone())
    }
}

impl From<&UserId> for FinanceManagerId {
    fn from(value: &UserId) -> Self {
        Self(value.0.clone())
    }
}

/// Lower-cases and collapses separators so `"dead_deal"`, `"Dead-Deal"` and
/// `"DEAD DEAL"` compare equal.
fn fold_label(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Vehicle inventory category of a deal.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum VehicleType {
    #[serde(rename = "N")]
    New,
    #[default]
    #[serde(rename = "U")]
    Used,
    #[serde(rename = "C")]
    Certified,
}

impl VehicleType {
    /// Single-letter code stored on the record.
    pub const fn code(self) -> &'static str {
        match self {
            VehicleType::New => "N",
            VehicleType::Used => "U",
            VehicleType::Certified => "C",
        }
    }

    /// Label shown on dashboards.
    pub const fn display_name(self) -> &'static str {
        match self {
            VehicleType::New => "New",
            VehicleType::Used => "Used",
            VehicleType::Certified => "Certified",
        }
    }
}

impl Display for VehicleType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for VehicleType {
    type Err = TypeConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_label(s).as_str() {
            "n" | "new" => Ok(VehicleType::New),
            "u" | "used" => Ok(VehicleType::Used),
            "c" | "cpo" | "certified" | "certified pre owned" => Ok(VehicleType::Certified),
            _ => Err(TypeConstraintError::UnknownVehicleType(s.to_string())),
        }
    }
}

/// Funding lifecycle of a deal.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum DealStatus {
    #[default]
    Pending,
    Funded,
    Unwound,
    #[serde(rename = "Dead Deal")]
    DeadDeal,
}

impl DealStatus {
    pub const ALL: [DealStatus; 4] = [
        DealStatus::Pending,
        DealStatus::Funded,
        DealStatus::Unwound,
        DealStatus::DeadDeal,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            DealStatus::Pending => "Pending",
            DealStatus::Funded => "Funded",
            DealStatus::Unwound => "Unwound",
            DealStatus::DeadDeal => "Dead Deal",
        }
    }

    /// Unwound and dead deals never contribute to sums or averages.
    pub const fn is_excluded_from_metrics(self) -> bool {
        matches!(self, DealStatus::Unwound | DealStatus::DeadDeal)
    }
}

impl Display for DealStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DealStatus {
    type Err = TypeConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_label(s).as_str() {
            "pending" => Ok(DealStatus::Pending),
            "funded" => Ok(DealStatus::Funded),
            "unwound" => Ok(DealStatus::Unwound),
            "dead deal" | "dead" => Ok(DealStatus::DeadDeal),
            _ => Err(TypeConstraintError::UnknownDealStatus(s.to_string())),
        }
    }
}

/// How the vehicle purchase was paid for.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum DealType {
    Cash,
    #[default]
    Finance,
    Lease,
}

impl DealType {
    pub const fn as_str(self) -> &'static str {
        match self {
            DealType::Cash => "Cash",
            DealType::Finance => "Finance",
            DealType::Lease => "Lease",
        }
    }
}

impl Display for DealType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DealType {
    type Err = TypeConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_label(s).as_str() {
            "cash" => Ok(DealType::Cash),
            "finance" | "financed" | "retail" => Ok(DealType::Finance),
            "lease" | "leased" => Ok(DealType::Lease),
            _ => Err(TypeConstraintError::UnknownDealType(s.to_string())),
        }
    }
}
