//! Runtime configuration
//!
//! Every path and currency choice lives here and is handed to components
//! explicitly; nothing reads module-level constants at run time.

use crate::currency::CurrencyCode;
use crate::data::feed::{ECB_90D_XML_URL, ECB_DAILY_XML_URL};
use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    /// History file name, relative to `data_dir`
    pub history_file: String,
    /// Derived series file name, relative to `data_dir`
    pub series_file: String,
    pub dashboard_file: PathBuf,
    /// The feed's quoting currency (has no column of its own)
    pub reference_currency: CurrencyCode,
    pub domestic_currency: CurrencyCode,
    pub targets: Vec<CurrencyCode>,
    /// Chart recency window; `None` or `0` charts the whole series
    pub chart_last_n_days: Option<u32>,
    pub daily_url: String,
    pub window_url: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            history_file: "history_eur_base.csv".to_string(),
            series_file: "history_pln.csv".to_string(),
            dashboard_file: PathBuf::from("dashboard.html"),
            reference_currency: CurrencyCode::EUR,
            domestic_currency: CurrencyCode::PLN,
            targets: vec![
                CurrencyCode::EUR,
                CurrencyCode::USD,
                CurrencyCode::GBP,
                CurrencyCode::CHF,
            ],
            chart_last_n_days: Some(365),
            daily_url: ECB_DAILY_XML_URL.to_string(),
            window_url: ECB_90D_XML_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| FxError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_file.trim().is_empty() || self.series_file.trim().is_empty() {
            return Err(FxError::Config("file names must not be empty".to_string()));
        }
        if self.history_file == self.series_file {
            return Err(FxError::Config(
                "history_file and series_file must differ".to_string(),
            ));
        }
        if self.targets.is_empty() {
            return Err(FxError::Config("at least one target currency is required".to_string()));
        }
        if self.reference_currency == self.domestic_currency {
            return Err(FxError::Config(format!(
                "domestic currency {} cannot be the feed's reference currency",
                self.domestic_currency
            )));
        }
        if self.timeout_secs == 0 {
            return Err(FxError::Config("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(&self.history_file)
    }

    pub fn series_path(&self) -> PathBuf {
        self.data_dir.join(&self.series_file)
    }

    /// TOML has no null, so `0` stands in for "unbounded"
    pub fn chart_window(&self) -> Option<u32> {
        self.chart_last_n_days.filter(|days| *days > 0)
    }
}
