//! Rate observations: one date, many currencies
//!
//! The feed layer produces [`RawObservation`]s exactly as published (text
//! dates and text rates). [`RateObservation::from_raw`] normalizes them,
//! recovering per-cell problems locally so a single bad rate never discards
//! the rest of the day.

use crate::currency::CurrencyCode;
use crate::error::{FxError, Result};
use crate::types::{RateDate, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

/// Observation as read off the wire
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawObservation {
    pub date: Option<String>,
    pub rates: Vec<(String, String)>,
}

impl RawObservation {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: Some(date.into()),
            rates: Vec::new(),
        }
    }

    pub fn with_rate(mut self, currency: impl Into<String>, rate: impl Into<String>) -> Self {
        self.rates.push((currency.into(), rate.into()));
        self
    }
}

/// Parse a date to day precision, discarding any time-of-day component
pub fn parse_date(text: &str) -> Option<RateDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.date_naive())
}

/// A dated set of currency -> rate pairs, codes unique and uppercase
#[derive(Debug, Clone, PartialEq)]
pub struct RateObservation {
    pub date: RateDate,
    pub rates: BTreeMap<CurrencyCode, Value>,
}

impl RateObservation {
    pub fn new(date: RateDate) -> Self {
        Self {
            date,
            rates: BTreeMap::new(),
        }
    }

    /// Builder used mostly by tests and the in-memory feed
    pub fn with_rate(mut self, currency: CurrencyCode, rate: impl Into<Value>) -> Self {
        self.rates.insert(currency, rate.into());
        self
    }

    pub fn get(&self, currency: CurrencyCode) -> Value {
        self.rates.get(&currency).copied().unwrap_or(Value::Missing)
    }

    /// Normalize a raw observation.
    ///
    /// Fails with [`FxError::Schema`] when the date is absent or unparsable.
    /// Bad rates are kept as `Missing` and reported as validation
    /// diagnostics next to the observation.
    pub fn from_raw(raw: &RawObservation) -> Result<(Self, Vec<FxError>)> {
        let date_text = raw
            .date
            .as_deref()
            .ok_or_else(|| FxError::Schema("observation has no date".to_string()))?;
        let date = parse_date(date_text).ok_or_else(|| {
            FxError::Schema(format!("observation has unusable date '{}'", date_text))
        })?;

        let mut observation = Self::new(date);
        let mut issues = Vec::new();

        for (code, rate_text) in &raw.rates {
            let currency = match CurrencyCode::from_code(code) {
                Ok(c) => c,
                Err(e) => {
                    issues.push(FxError::Validation {
                        date,
                        currency: code.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let value = match rate_text.trim().parse::<f64>() {
                Ok(rate) if rate.is_finite() && rate > 0.0 => Value::Present(rate),
                Ok(rate) => {
                    issues.push(FxError::Validation {
                        date,
                        currency: currency.to_string(),
                        reason: format!("rate {} is not a positive finite number", rate),
                    });
                    Value::Missing
                }
                Err(e) => {
                    issues.push(FxError::Validation {
                        date,
                        currency: currency.to_string(),
                        reason: format!("'{}' is not a number: {}", rate_text, e),
                    });
                    Value::Missing
                }
            };
            observation.rates.insert(currency, value);
        }

        Ok((observation, issues))
    }
}

/// Observations keyed by date; a later observation for the same date
/// replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationBatch {
    observations: BTreeMap<RateDate, RateObservation>,
}

impl ObservationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch holding a single observation
    pub fn single(observation: RateObservation) -> Self {
        let mut batch = Self::new();
        batch.push(observation);
        batch
    }

    /// Add an observation, returning the one it replaced
    pub fn push(&mut self, observation: RateObservation) -> Option<RateObservation> {
        self.observations.insert(observation.date, observation)
    }

    /// Normalize raw observations.
    ///
    /// Observations without a usable date are dropped; the returned
    /// diagnostics list them along with every coerced rate.
    pub fn from_raw<'a, I>(raws: I) -> (Self, Vec<FxError>)
    where
        I: IntoIterator<Item = &'a RawObservation>,
    {
        let mut batch = Self::new();
        let mut issues = Vec::new();

        for raw in raws {
            match RateObservation::from_raw(raw) {
                Ok((observation, mut cell_issues)) => {
                    issues.append(&mut cell_issues);
                    if batch.push(observation).is_some() {
                        log::debug!("Duplicate date in feed batch, keeping the last one");
                    }
                }
                Err(e) => issues.push(e),
            }
        }

        (batch, issues)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn get(&self, date: RateDate) -> Option<&RateObservation> {
        self.observations.get(&date)
    }

    /// Observations in ascending date order
    pub fn iter(&self) -> impl Iterator<Item = &RateObservation> {
        self.observations.values()
    }
}

impl FromIterator<RateObservation> for ObservationBatch {
    fn from_iter<I: IntoIterator<Item = RateObservation>>(iter: I) -> Self {
        let mut batch = Self::new();
        for observation in iter {
            batch.push(observation);
        }
        batch
    }
}

impl IntoIterator for ObservationBatch {
    type Item = RateObservation;
    type IntoIter = std::collections::btree_map::IntoValues<RateDate, RateObservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.into_values()
    }
}
