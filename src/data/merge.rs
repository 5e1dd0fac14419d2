//! Merge engine: reconcile fetched observations into the history
//!
//! Two strategies, chosen explicitly by the caller:
//!
//! - [`MergeStrategy::UpdateOverlapping`] (backfill): existing dates get a
//!   partial update, new dates are inserted.
//! - [`MergeStrategy::InsertIfAbsent`] (daily): existing dates are left
//!   exactly as they are, new dates are inserted.
//!
//! Both are idempotent and never remove a column or a value that the batch
//! does not mention.

use super::history::HistoricalDataset;
use crate::currency::CurrencyCode;
use crate::observation::{ObservationBatch, RateObservation};
use crate::types::{RateDate, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Overwrite cells the observation carries a value for, keep the rest
    UpdateOverlapping,
    /// Never touch a date that is already recorded
    InsertIfAbsent,
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeStrategy::UpdateOverlapping => write!(f, "update-overlapping"),
            MergeStrategy::InsertIfAbsent => write!(f, "insert-if-absent"),
        }
    }
}

/// What a merge did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeReport {
    pub inserted: Vec<RateDate>,
    /// Existing dates that went through a partial update
    pub updated: Vec<RateDate>,
    /// Existing dates left alone under `InsertIfAbsent`
    pub skipped: Vec<RateDate>,
    pub new_columns: Vec<CurrencyCode>,
    /// Cells whose stored value actually changed
    pub cells_changed: usize,
}

impl MergeReport {
    pub fn is_noop(&self) -> bool {
        self.inserted.is_empty() && self.cells_changed == 0 && self.new_columns.is_empty()
    }
}

impl HistoricalDataset {
    /// Merge a batch in place using `strategy`
    pub fn merge_batch(&mut self, batch: &ObservationBatch, strategy: MergeStrategy) -> MergeReport {
        let mut report = MergeReport::default();

        for observation in batch.iter() {
            let exists = self.contains_date(observation.date);
            match (exists, strategy) {
                (true, MergeStrategy::InsertIfAbsent) => {
                    log::debug!(
                        "{} already recorded, leaving the existing row untouched",
                        observation.date
                    );
                    report.skipped.push(observation.date);
                }
                (true, MergeStrategy::UpdateOverlapping) => {
                    self.apply(observation, false, &mut report);
                    report.updated.push(observation.date);
                }
                (false, _) => {
                    self.apply(observation, true, &mut report);
                    report.inserted.push(observation.date);
                }
            }
        }

        report
    }

    /// Write an observation's cells into its row.
    ///
    /// A fresh row takes every cell including `Missing`. An existing row only
    /// takes present values, so a gap in the new data never erases a value
    /// recorded earlier.
    fn apply(&mut self, observation: &RateObservation, fresh: bool, report: &mut MergeReport) {
        let slots: Vec<(usize, Value)> = observation
            .rates
            .iter()
            .map(|(currency, value)| {
                let (slot, created) = self.ensure_column(*currency);
                if created {
                    report.new_columns.push(*currency);
                }
                (slot, *value)
            })
            .collect();

        let (cells, _) = self.row_mut_or_insert(observation.date);
        for (slot, value) in slots {
            if value.is_missing() && !fresh {
                continue;
            }
            if cells[slot] != value {
                cells[slot] = value;
                report.cells_changed += 1;
            }
        }
    }

    /// Daily shortcut: insert `observation` only if its date is new
    pub fn insert_if_absent(&mut self, observation: RateObservation) -> bool {
        let report = self.merge_batch(
            &ObservationBatch::single(observation),
            MergeStrategy::InsertIfAbsent,
        );
        !report.inserted.is_empty()
    }
}

/// Merge `batch` into `history`, returning the updated history.
///
/// Rows of the result are ascending by date with one row per date.
pub fn merge(
    mut history: HistoricalDataset,
    batch: &ObservationBatch,
    strategy: MergeStrategy,
) -> (HistoricalDataset, MergeReport) {
    let report = history.merge_batch(batch, strategy);
    log::info!(
        "Merged {} observation(s) with {}: {} inserted, {} updated, {} skipped, {} new column(s)",
        batch.len(),
        strategy,
        report.inserted.len(),
        report.updated.len(),
        report.skipped.len(),
        report.new_columns.len()
    );
    (history, report)
}
