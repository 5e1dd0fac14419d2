//! Core types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar date of an observation (day resolution)
pub type RateDate = NaiveDate;

/// Rate type (units of a currency per one unit of the quoting currency)
pub type Rate = f64;

/// A table cell: either a usable number or explicitly missing.
///
/// Missing is never represented by a sentinel number, so it cannot be
/// mistaken for a zero rate or leak NaN into arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    Present(Rate),
    #[default]
    Missing,
}

impl Value {
    /// Wrap a float; NaN and infinities become `Missing`
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Value::Present(value)
        } else {
            Value::Missing
        }
    }

    /// Parse a stored cell; empty text is `Missing`
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Value::Missing);
        }
        text.parse::<f64>()
            .map(Value::from_f64)
            .map_err(|e| format!("'{}' is not a number: {}", text, e))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Present(v) => Some(*v),
            Value::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Divide, yielding `Missing` for a missing operand or a zero denominator
    pub fn checked_div(self, denominator: Value) -> Value {
        match (self, denominator) {
            (Value::Present(n), Value::Present(d)) if d != 0.0 => Value::from_f64(n / d),
            _ => Value::Missing,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::from_f64(value)
    }
}

impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Value::Missing, Value::from_f64)
    }
}

/// Empty for missing, shortest round-trip representation otherwise
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Present(v) => write!(f, "{}", v),
            Value::Missing => Ok(()),
        }
    }
}
