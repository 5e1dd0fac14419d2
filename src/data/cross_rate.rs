//! Cross-rate derivation: base-currency quotes -> domestic-currency prices
//!
//! The feed quotes "1 unit of the reference currency = X units of C". The
//! domestic price of one unit of C is therefore `domestic / C` on the same
//! date.

use super::history::HistoricalDataset;
use crate::currency::CurrencyCode;
use crate::error::{FxError, Result};
use crate::types::{RateDate, Value};
use chrono::Duration;
use std::collections::BTreeMap;

/// Domestic-currency prices for a set of target currencies
#[derive(Debug, Clone, PartialEq)]
pub struct CrossRateSeries {
    domestic: CurrencyCode,
    targets: Vec<CurrencyCode>,
    rows: BTreeMap<RateDate, Vec<Value>>,
}

impl CrossRateSeries {
    pub fn new(domestic: CurrencyCode, targets: Vec<CurrencyCode>) -> Self {
        Self {
            domestic,
            targets,
            rows: BTreeMap::new(),
        }
    }

    pub fn domestic(&self) -> CurrencyCode {
        self.domestic
    }

    /// Targets that made it into the series, in output column order
    pub fn targets(&self) -> &[CurrencyCode] {
        &self.targets
    }

    /// Output column names, e.g. `USD_PLN`
    pub fn column_names(&self) -> Vec<String> {
        self.targets
            .iter()
            .map(|t| t.cross_column(self.domestic))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<RateDate> {
        self.rows.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<RateDate> {
        self.rows.keys().next_back().copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = (RateDate, &[Value])> + '_ {
        self.rows.iter().map(|(d, cells)| (*d, cells.as_slice()))
    }

    pub fn get(&self, date: RateDate, target: CurrencyCode) -> Value {
        let slot = self.targets.iter().position(|t| *t == target);
        match (self.rows.get(&date), slot) {
            (Some(cells), Some(slot)) => cells[slot],
            _ => Value::Missing,
        }
    }

    pub fn column(&self, target: CurrencyCode) -> Option<Vec<(RateDate, Value)>> {
        let slot = self.targets.iter().position(|t| *t == target)?;
        Some(self.rows.iter().map(|(d, cells)| (*d, cells[slot])).collect())
    }

    pub(crate) fn push_row(&mut self, date: RateDate, cells: Vec<Value>) {
        debug_assert_eq!(cells.len(), self.targets.len());
        self.rows.insert(date, cells);
    }

    /// Keep only rows within `last_n_days` of the latest date (inclusive).
    /// `None`, or a window reaching past the earliest representable date,
    /// keeps everything.
    pub fn window(&self, last_n_days: Option<u32>) -> CrossRateSeries {
        let (Some(days), Some(last)) = (last_n_days, self.last_date()) else {
            return self.clone();
        };
        let Some(cutoff) = last.checked_sub_signed(Duration::days(i64::from(days))) else {
            return self.clone();
        };
        CrossRateSeries {
            domestic: self.domestic,
            targets: self.targets.clone(),
            rows: self
                .rows
                .range(cutoff..)
                .map(|(d, cells)| (*d, cells.clone()))
                .collect(),
        }
    }
}

/// Computes [`CrossRateSeries`] from a [`HistoricalDataset`]
#[derive(Debug, Clone, Copy)]
pub struct CrossRateDeriver {
    domestic: CurrencyCode,
    reference: Option<CurrencyCode>,
}

impl CrossRateDeriver {
    pub fn new(domestic: CurrencyCode) -> Self {
        Self {
            domestic,
            reference: None,
        }
    }

    /// Declare the feed's quoting currency. It never has a column of its
    /// own; as a target it is priced straight from the domestic column,
    /// the same way the domestic currency itself is.
    pub fn with_reference(mut self, reference: CurrencyCode) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn domestic(&self) -> CurrencyCode {
        self.domestic
    }

    /// Derive the series for `targets`.
    ///
    /// Fails only when the domestic column is absent. Targets with no column
    /// are skipped, undefined cells are `Missing`, and dates where every
    /// target is missing are dropped.
    pub fn derive(&self, history: &HistoricalDataset, targets: &[CurrencyCode]) -> Result<CrossRateSeries> {
        let domestic_slot =
            history
                .column_index(self.domestic)
                .ok_or_else(|| FxError::MissingBaseCurrency {
                    currency: self.domestic.to_string(),
                })?;

        // (target, slot of its base column; None = domestic column value as is)
        let mut plan: Vec<(CurrencyCode, Option<usize>)> = Vec::new();
        for target in targets {
            if plan.iter().any(|(t, _)| t == target) {
                continue;
            }
            if *target == self.domestic || Some(*target) == self.reference {
                plan.push((*target, None));
            } else if let Some(slot) = history.column_index(*target) {
                plan.push((*target, Some(slot)));
            } else {
                log::debug!("Target {} has no column in history yet, skipping", target);
            }
        }

        let mut series = CrossRateSeries::new(self.domestic, plan.iter().map(|(t, _)| *t).collect());
        if plan.is_empty() {
            return Ok(series);
        }

        for (date, cells) in history.rows() {
            let domestic = cells[domestic_slot];
            let derived: Vec<Value> = plan
                .iter()
                .map(|(_, slot)| match slot {
                    None => domestic,
                    Some(slot) => domestic.checked_div(cells[*slot]),
                })
                .collect();

            if derived.iter().all(Value::is_missing) {
                continue;
            }
            series.push_row(date, derived);
        }

        log::info!(
            "Derived {} row(s) for {} in {}",
            series.len(),
            series.column_names().join(", "),
            self.domestic
        );
        Ok(series)
    }
}

/// Derive cross rates with no reference currency configured
pub fn derive(
    history: &HistoricalDataset,
    targets: &[CurrencyCode],
    domestic: CurrencyCode,
) -> Result<CrossRateSeries> {
    CrossRateDeriver::new(domestic).derive(history, targets)
}
