//! Rate data handling
//!
//! - **history**: the wide, date-keyed historical dataset
//! - **merge**: reconciling fetched observations into the history
//! - **cross_rate**: deriving domestic-currency prices
//! - **store**: CSV persistence
//! - **feed**: ECB XML feed and the [`RateFeed`](feed::RateFeed) seam

pub mod cross_rate;
pub mod feed;
pub mod history;
pub mod merge;
pub mod store;

pub use cross_rate::{derive, CrossRateDeriver, CrossRateSeries};
pub use feed::{RateFeed, StaticFeed};
pub use history::HistoricalDataset;
pub use merge::{merge, MergeReport, MergeStrategy};
pub use store::{save_series, HistoryStore};

#[cfg(feature = "fetch")]
pub use feed::EcbFeed;
