//! # rusty-fxrates
//!
//! Keeps a long-lived history of ECB daily reference rates, merged
//! incrementally from the daily snapshot and the rolling 90-day window, and
//! derives each tracked currency's price in a domestic currency.
//!
//! ## Example
//!
//! ```rust
//! use rusty_fxrates::prelude::*;
//! use chrono::NaiveDate;
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//! let observation = RateObservation::new(date)
//!     .with_rate(CurrencyCode::PLN, 4.35)
//!     .with_rate(CurrencyCode::USD, 1.10);
//!
//! let (history, _report) = merge(
//!     HistoricalDataset::new(),
//!     &ObservationBatch::single(observation),
//!     MergeStrategy::UpdateOverlapping,
//! );
//!
//! let series = derive(&history, &[CurrencyCode::USD], CurrencyCode::PLN).unwrap();
//! let usd_in_pln = series.get(date, CurrencyCode::USD).as_f64().unwrap();
//! assert!((usd_in_pln - 3.9545).abs() < 1e-4);
//! ```

pub mod config;
pub mod currency;
pub mod data;
pub mod engine;
pub mod error;
pub mod observation;
pub mod render;
pub mod types;

pub mod prelude {
    //! Commonly used types and functions
    pub use crate::config::Config;
    pub use crate::currency::CurrencyCode;
    pub use crate::data::{
        derive, merge, CrossRateDeriver, CrossRateSeries, HistoricalDataset, HistoryStore,
        MergeReport, MergeStrategy, RateFeed, StaticFeed,
    };
    pub use crate::engine::{Flow, RatePipeline, RunSummary};
    pub use crate::error::{FxError, Result};
    pub use crate::observation::{ObservationBatch, RateObservation, RawObservation};
    pub use crate::render::Dashboard;
    pub use crate::types::*;
}
