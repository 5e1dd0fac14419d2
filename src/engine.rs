//! Flow runner: fetch -> merge -> persist -> derive -> persist/render
//!
//! Each flow runs to completion on the calling thread. Callers must not run
//! two flows against the same store at once; there is no file locking.

use crate::config::Config;
use crate::data::cross_rate::{CrossRateDeriver, CrossRateSeries};
use crate::data::feed::RateFeed;
use crate::data::history::HistoricalDataset;
use crate::data::merge::{merge, MergeReport, MergeStrategy};
use crate::data::store::{save_series, HistoryStore};
use crate::error::{FxError, Result};
use crate::observation::{ObservationBatch, RawObservation};
use crate::render::Dashboard;
use crate::types::RateDate;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// Single-day snapshot, insert-if-absent
    Daily,
    /// Rolling window, update overlapping dates
    Backfill,
    /// Recompute outputs from stored history only
    Rederive,
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Daily => write!(f, "daily"),
            Flow::Backfill => write!(f, "backfill"),
            Flow::Rederive => write!(f, "rederive"),
        }
    }
}

/// Outcome of one flow execution
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub flow: Flow,
    /// Raw observations returned by the feed
    pub fetched: usize,
    /// Observations dropped for lack of a usable date
    pub dropped: usize,
    /// Rate cells recorded as missing because they failed validation
    pub coerced: usize,
    pub rows_before: usize,
    pub rows_after: usize,
    pub merge: MergeReport,
    pub history_written: bool,
    pub derived_rows: usize,
    pub last_date: Option<RateDate>,
    pub dashboard: Option<PathBuf>,
}

impl RunSummary {
    fn new(flow: Flow, rows_before: usize) -> Self {
        Self {
            flow,
            fetched: 0,
            dropped: 0,
            coerced: 0,
            rows_before,
            rows_after: rows_before,
            merge: MergeReport::default(),
            history_written: false,
            derived_rows: 0,
            last_date: None,
            dashboard: None,
        }
    }
}

/// Runs the daily and backfill flows against one configured store
pub struct RatePipeline {
    config: Config,
    store: HistoryStore,
    deriver: CrossRateDeriver,
    dashboard: Dashboard,
}

impl RatePipeline {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let store = HistoryStore::new(config.history_path());
        let deriver = CrossRateDeriver::new(config.domestic_currency)
            .with_reference(config.reference_currency);
        let dashboard = Dashboard::new(config.chart_window());
        Ok(Self {
            config,
            store,
            deriver,
            dashboard,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Daily flow: one snapshot, existing dates are never rewritten
    pub fn run_daily<F: RateFeed + ?Sized>(&self, feed: &F) -> Result<RunSummary> {
        let history = self.store.load()?;
        log::info!("Fetching daily snapshot from {}", feed.name());
        let raw = feed.fetch_daily()?;
        self.ingest(Flow::Daily, history, vec![raw], MergeStrategy::InsertIfAbsent, true)
    }

    /// Backfill flow: rolling window, overlapping dates get partial updates.
    /// The dashboard is only rendered when `render` is set.
    pub fn run_backfill<F: RateFeed + ?Sized>(&self, feed: &F, render: bool) -> Result<RunSummary> {
        let history = self.store.load()?;
        log::info!("Fetching rolling window from {}", feed.name());
        let raws = feed.fetch_window()?;
        self.ingest(Flow::Backfill, history, raws, MergeStrategy::UpdateOverlapping, render)
    }

    /// Recompute the derived series (and optionally the dashboard) from
    /// stored history without touching the feed
    pub fn rederive(&self, render: bool) -> Result<RunSummary> {
        let history = self.store.load()?;
        let mut summary = RunSummary::new(Flow::Rederive, history.len());
        self.publish(&history, render, &mut summary)?;
        Ok(summary)
    }

    /// Derive from stored history and return the series without writing it
    pub fn derive_only(&self) -> Result<CrossRateSeries> {
        let history = self.store.load()?;
        self.deriver.derive(&history, &self.config.targets)
    }

    fn ingest(
        &self,
        flow: Flow,
        history: HistoricalDataset,
        raws: Vec<RawObservation>,
        strategy: MergeStrategy,
        render: bool,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::new(flow, history.len());
        summary.fetched = raws.len();

        let (batch, issues) = ObservationBatch::from_raw(&raws);
        for issue in &issues {
            match issue {
                FxError::Schema(_) => summary.dropped += 1,
                FxError::Validation { .. } => summary.coerced += 1,
                _ => {}
            }
            log::warn!("{}", issue);
        }
        if batch.is_empty() {
            log::warn!("Feed produced no usable observation, history left unchanged");
        }

        let (history, report) = merge(history, &batch, strategy);
        summary.rows_after = history.len();

        if report.is_noop() && self.store.exists() {
            log::info!("History unchanged, not rewriting {}", self.store.path().display());
        } else {
            self.store.save(&history)?;
            summary.history_written = true;
        }
        summary.merge = report;

        self.publish(&history, render, &mut summary)?;
        Ok(summary)
    }

    fn publish(&self, history: &HistoricalDataset, render: bool, summary: &mut RunSummary) -> Result<()> {
        let series = self.deriver.derive(history, &self.config.targets)?;
        save_series(&self.config.series_path(), &series)?;
        summary.derived_rows = series.len();
        summary.last_date = series.last_date();

        if render {
            self.dashboard
                .write(&self.config.dashboard_file, &series, &self.config.targets)?;
            summary.dashboard = Some(self.config.dashboard_file.clone());
        }
        Ok(())
    }
}
