//! Field-level sanitizers for untrusted deal values.
//!
//! Every `check_*` function returns a usable value no matter what it is fed,
//! together with the [`FieldError`] describing any substitution it had to
//! make. The plain `sanitize_*`/`validate_*`/`map_*` wrappers drop the error
//! and keep the value, which is what the lenient mapper wants.

use std::sync::LazyLock;

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::domain::types::{DealStatus, DealType, TypeConstraintError, VehicleType};

/// Largest magnitude accepted for any currency amount.
pub const MAX_CURRENCY: f64 = 999_999.99;

/// How far back a deal date may lie.
pub const DATE_LOOKBACK_MONTHS: u32 = 36;

/// How far ahead a deal date may lie.
pub const DATE_LOOKAHEAD_DAYS: u64 = 30;

static MALICIOUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)<\s*script|javascript\s*:|vbscript\s*:|data\s*:\s*text/html|on\w+\s*=",
        r"|<\s*iframe|<\s*object|<\s*embed",
    ))
    .expect("valid blocklist pattern")
});

const FREEFORM_DATE_FORMATS: [&str; 5] =
    ["%m/%d/%Y", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"];

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Why a field value was replaced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("unexpected {0} value")]
    UnexpectedType(&'static str),
    #[error("value matched the blocked content list")]
    MaliciousContent,
    #[error("value truncated to {0} characters")]
    Truncated(usize),
    #[error("value does not match the allowed pattern")]
    PatternMismatch,
    #[error("not a finite number: {0}")]
    NotANumber(String),
    #[error("{value} clamped to {clamped}")]
    OutOfRange { value: f64, clamped: f64 },
    #[error("unrecognised date: {0}")]
    InvalidDate(String),
    #[error("{0} is outside the accepted date range")]
    DateOutOfRange(NaiveDate),
    #[error(transparent)]
    Constraint(#[from] TypeConstraintError),
}

/// A sanitized value and the reason it differs from its input, if it does.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<T> {
    pub value: T,
    pub issue: Option<FieldError>,
}

impl<T> Validated<T> {
    pub fn ok(value: T) -> Self {
        Self { value, issue: None }
    }

    pub fn substituted(value: T, issue: FieldError) -> Self {
        Self {
            value,
            issue: Some(issue),
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Constraints applied by [`sanitize_string`].
#[derive(Debug, Clone, Copy)]
pub struct StringRules<'a> {
    pub max_len: usize,
    pub whitelist: Option<&'a Regex>,
}

impl<'a> StringRules<'a> {
    pub const fn max(max_len: usize) -> Self {
        Self {
            max_len,
            whitelist: None,
        }
    }

    pub const fn whitelist(mut self, pattern: &'a Regex) -> Self {
        self.whitelist = Some(pattern);
        self
    }
}

/// Constraints applied by [`validate_number`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberBounds {
    pub min: f64,
    pub max: f64,
    /// Accept `"$1,250.00"` style input by dropping `$` and `,`.
    pub allow_separators: bool,
}

impl NumberBounds {
    pub const CURRENCY: NumberBounds = NumberBounds {
        min: -MAX_CURRENCY,
        max: MAX_CURRENCY,
        allow_separators: true,
    };

    /// Same range as [`NumberBounds::CURRENCY`] but only plain numerals parse.
    pub const STRICT_CURRENCY: NumberBounds = NumberBounds {
        allow_separators: false,
        ..NumberBounds::CURRENCY
    };

    pub const fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            allow_separators: false,
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whether `text` contains markup or a script URI from the blocklist.
pub fn is_malicious(text: &str) -> bool {
    MALICIOUS_RE.is_match(text)
}

pub fn check_string(value: Option<&Value>, rules: &StringRules<'_>) -> Validated<String> {
    let text = match value {
        None | Some(Value::Null) => return Validated::ok(String::new()),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            log::warn!("Discarding {} where text was expected", type_name(other));
            return Validated::substituted(
                String::new(),
                FieldError::UnexpectedType(type_name(other)),
            );
        }
    };

    // Stripping brackets can join a split token, so check both forms.
    let cleaned = text.replace(['<', '>'], "");
    if is_malicious(&text) || is_malicious(&cleaned) {
        log::warn!("Discarding text that matched the blocked content list");
        return Validated::substituted(String::new(), FieldError::MaliciousContent);
    }

    let trimmed = cleaned.trim();

    let mut issue = None;
    let bounded = if trimmed.chars().count() > rules.max_len {
        log::warn!("Truncating text to {} characters", rules.max_len);
        issue = Some(FieldError::Truncated(rules.max_len));
        trimmed.chars().take(rules.max_len).collect::<String>().trim_end().to_string()
    } else {
        trimmed.to_string()
    };

    if let Some(pattern) = rules.whitelist {
        if !bounded.is_empty() && !pattern.is_match(&bounded) {
            log::warn!("Discarding text that does not match the allowed pattern");
            return Validated::substituted(String::new(), FieldError::PatternMismatch);
        }
    }

    Validated {
        value: bounded,
        issue,
    }
}

/// Strips blocked content, trims and bounds a text value. Never fails; the
/// result is empty when the input cannot be made safe.
pub fn sanitize_string(value: Option<&Value>, rules: &StringRules<'_>) -> String {
    check_string(value, rules).into_value()
}

/// Rounds to whole cents, normalising `-0.0`.
pub fn round_cents(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 { 0.0 } else { rounded }
}

fn parse_numeric_text(text: &str, allow_separators: bool) -> Option<f64> {
    let trimmed = text.trim();
    let parsed = if allow_separators {
        let cleaned: String = trimmed
            .chars()
            .filter(|c| !matches!(c, ',' | '$') && !c.is_whitespace())
            .collect();
        cleaned.parse::<f64>()
    } else {
        trimmed.parse::<f64>()
    };
    parsed.ok()
}

pub fn check_number(value: Option<&Value>, bounds: &NumberBounds) -> Validated<f64> {
    let parsed = match value {
        None | Some(Value::Null) => return Validated::ok(0.0),
        Some(Value::String(s)) if s.trim().is_empty() => return Validated::ok(0.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_numeric_text(s, bounds.allow_separators),
        Some(other) => {
            log::warn!("Expected a number, got {}", type_name(other));
            return Validated::substituted(0.0, FieldError::UnexpectedType(type_name(other)));
        }
    };

    let number = match parsed {
        Some(n) if n.is_finite() => n,
        _ => {
            let shown = value.map(Value::to_string).unwrap_or_default();
            log::warn!("Replacing non-numeric value {shown} with 0");
            return Validated::substituted(0.0, FieldError::NotANumber(shown));
        }
    };

    if number < bounds.min || number > bounds.max {
        let clamped = round_cents(number.clamp(bounds.min, bounds.max));
        log::warn!("Clamping out-of-range value {number} to {clamped}");
        return Validated::substituted(
            clamped,
            FieldError::OutOfRange {
                value: number,
                clamped,
            },
        );
    }

    Validated::ok(round_cents(number))
}

/// Parses a number, clamps it into `bounds` and rounds to two decimals.
/// Non-finite or unparsable input yields `0.0`.
pub fn validate_number(value: Option<&Value>, bounds: &NumberBounds) -> f64 {
    check_number(value, bounds).into_value()
}

/// Re-clamps an already numeric value through the currency bounds.
pub fn clamp_currency(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    round_cents(value.clamp(-MAX_CURRENCY, MAX_CURRENCY))
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.with_timezone(&Utc).date_naive());
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|datetime| datetime.date())
        .or_else(|| {
            FREEFORM_DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        })
}

/// Inclusive `[earliest, latest]` window of acceptable deal dates.
pub fn date_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let earliest = today
        .checked_sub_months(Months::new(DATE_LOOKBACK_MONTHS))
        .unwrap_or(NaiveDate::MIN);
    let latest = today
        .checked_add_days(chrono::Days::new(DATE_LOOKAHEAD_DAYS))
        .unwrap_or(NaiveDate::MAX);
    (earliest, latest)
}

pub fn check_date(value: Option<&Value>, today: NaiveDate) -> Validated<Option<NaiveDate>> {
    let text = match value {
        None | Some(Value::Null) => return Validated::ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Validated::ok(None),
        Some(Value::String(s)) => s,
        Some(other) => {
            log::warn!("Expected a date string, got {}", type_name(other));
            return Validated::substituted(None, FieldError::UnexpectedType(type_name(other)));
        }
    };

    let Some(date) = parse_date_text(text) else {
        log::warn!("Rejecting unparsable date {text:?}");
        return Validated::substituted(None, FieldError::InvalidDate(text.clone()));
    };

    let (earliest, latest) = date_window(today);
    if date < earliest || date > latest {
        log::warn!("Rejecting date {date} outside {earliest}..={latest}");
        return Validated::substituted(None, FieldError::DateOutOfRange(date));
    }

    Validated::ok(Some(date))
}

/// Parses a deal date and rejects anything outside
/// `[today - 3 years, today + 30 days]`.
pub fn validate_date(value: Option<&Value>, today: NaiveDate) -> Option<NaiveDate> {
    check_date(value, today).into_value()
}

fn check_label<T, F>(value: Option<&Value>, parse: F) -> Validated<T>
where
    T: Default,
    F: FnOnce(&str) -> Result<T, TypeConstraintError>,
{
    match value {
        None | Some(Value::Null) => Validated::ok(T::default()),
        Some(Value::String(s)) if s.trim().is_empty() => Validated::ok(T::default()),
        Some(Value::String(s)) => match parse(s) {
            Ok(parsed) => Validated::ok(parsed),
            Err(err) => {
                log::warn!("Using default for {err}");
                Validated::substituted(T::default(), err.into())
            }
        },
        Some(other) => {
            log::warn!("Expected a label, got {}", type_name(other));
            Validated::substituted(T::default(), FieldError::UnexpectedType(type_name(other)))
        }
    }
}

pub fn check_vehicle_type(value: Option<&Value>) -> Validated<VehicleType> {
    check_label(value, str::parse::<VehicleType>)
}

/// Case-insensitive vehicle type lookup; anything unrecognised is `Used`.
pub fn map_vehicle_type(value: Option<&Value>) -> VehicleType {
    check_vehicle_type(value).into_value()
}

pub fn check_deal_status(value: Option<&Value>) -> Validated<DealStatus> {
    check_label(value, str::parse::<DealStatus>)
}

/// Case-insensitive status lookup; anything unrecognised is `Pending`.
pub fn map_deal_status(value: Option<&Value>) -> DealStatus {
    check_deal_status(value).into_value()
}

pub fn check_deal_type(value: Option<&Value>) -> Validated<DealType> {
    check_label(value, str::parse::<DealType>)
}

pub fn map_deal_type(value: Option<&Value>) -> DealType {
    check_deal_type(value).into_value()
}

/// Reads a boolean flag, accepting common string and numeric spellings.
pub fn check_bool(value: Option<&Value>, default: bool) -> Validated<bool> {
    match value {
        None | Some(Value::Null) => Validated::ok(default),
        Some(Value::Bool(b)) => Validated::ok(*b),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Validated::ok(false),
        Some(Value::Number(n)) if n.as_f64() == Some(1.0) => Validated::ok(true),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Validated::ok(true),
            "false" | "no" | "n" | "0" => Validated::ok(false),
            "" => Validated::ok(default),
            _ => {
                log::warn!("Using default for unrecognised flag {s:?}");
                Validated::substituted(default, FieldError::UnexpectedType("string"))
            }
        },
        Some(other) => {
            log::warn!("Expected a flag, got {}", type_name(other));
            Validated::substituted(default, FieldError::UnexpectedType(type_name(other)))
        }
    }
}

/// Reads an optional identifier into one of the bounded id newtypes.
pub fn check_id<T>(value: Option<&Value>) -> Validated<Option<T>>
where
    T: TryFrom<String, Error = TypeConstraintError>,
{
    let text = match value {
        None | Some(Value::Null) => return Validated::ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Validated::ok(None),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            log::warn!("Expected an identifier, got {}", type_name(other));
            return Validated::substituted(None, FieldError::UnexpectedType(type_name(other)));
        }
    };

    match T::try_from(text) {
        Ok(id) => Validated::ok(Some(id)),
        Err(err) => {
            log::warn!("Dropping identifier: {err}");
            Validated::substituted(None, err.into())
        }
    }
}
