//! CSV persistence for the historical dataset and the derived series
//!
//! History layout: `date,<CCY>,<CCY>,...`, one row per date, ascending,
//! missing cells as empty fields. Writes go to a sibling temporary file that
//! is renamed into place, so an interrupted run never leaves a truncated
//! history behind.

use super::cross_rate::CrossRateSeries;
use super::history::HistoricalDataset;
use crate::currency::CurrencyCode;
use crate::error::{FxError, Result};
use crate::observation::parse_date;
use crate::types::Value;
use csv::{ReaderBuilder, StringRecord, Writer};
use std::fs;
use std::path::{Path, PathBuf};

const DATE_COLUMN: &str = "date";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Load/save of the historical dataset at a fixed path
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load and normalize the stored history.
    ///
    /// A missing file yields an empty dataset. Headers are uppercased, dates
    /// truncated to the day, rows sorted, duplicate dates folded (later
    /// present cells win), and unparsable cells read as missing. A row whose
    /// date cannot be read fails the load with [`FxError::Storage`].
    pub fn load(&self) -> Result<HistoricalDataset> {
        if !self.path.exists() {
            log::info!("No history at {}, starting empty", self.path.display());
            return Ok(HistoricalDataset::new());
        }

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| FxError::storage(&self.path, e))?;

        let headers = rdr
            .headers()
            .map_err(|e| FxError::storage(&self.path, e))?
            .clone();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Ok(HistoricalDataset::new());
        }

        let (date_idx, codes) = self.parse_headers(&headers)?;
        let mut dataset = HistoricalDataset::with_columns(codes.iter().map(|(_, c)| *c));

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| FxError::storage(&self.path, e))?;
            let raw_date = record.get(date_idx).unwrap_or("");
            let date = parse_date(raw_date).ok_or_else(|| {
                FxError::storage(
                    &self.path,
                    format!("row {}: unusable date '{}'", line + 2, raw_date),
                )
            })?;

            dataset.row_mut_or_insert(date);
            for (idx, code) in &codes {
                let text = record.get(*idx).unwrap_or("");
                let value = Value::parse(text).unwrap_or_else(|reason| {
                    log::warn!(
                        "{}: {} on {}: {}, recording as missing",
                        self.path.display(),
                        code,
                        date,
                        reason
                    );
                    Value::Missing
                });
                if !value.is_missing() {
                    dataset.set(date, *code, value);
                }
            }
        }

        log::debug!(
            "Loaded {} row(s), {} currency column(s) from {}",
            dataset.len(),
            dataset.columns().len(),
            self.path.display()
        );
        Ok(dataset)
    }

    fn parse_headers(&self, headers: &StringRecord) -> Result<(usize, Vec<(usize, CurrencyCode)>)> {
        let mut date_idx = None;
        let mut codes = Vec::new();

        for (idx, header) in headers.iter().enumerate() {
            let header = header.trim();
            if header.eq_ignore_ascii_case(DATE_COLUMN) {
                date_idx = Some(idx);
                continue;
            }
            let code = CurrencyCode::from_code(header).map_err(|_| {
                FxError::storage(&self.path, format!("unrecognised column '{}'", header))
            })?;
            codes.push((idx, code));
        }

        let date_idx = date_idx
            .ok_or_else(|| FxError::storage(&self.path, "no 'date' column in header"))?;
        Ok((date_idx, codes))
    }

    /// Write the dataset, ascending by date
    pub fn save(&self, dataset: &HistoricalDataset) -> Result<()> {
        let mut header = vec![DATE_COLUMN.to_string()];
        header.extend(dataset.columns().iter().map(|c| c.to_string()));

        let rows = dataset.rows().map(|(date, cells)| {
            let mut record = Vec::with_capacity(cells.len() + 1);
            record.push(date.format(DATE_FORMAT).to_string());
            record.extend(cells.iter().map(Value::to_string));
            record
        });

        write_atomic(&self.path, &header, rows)?;
        log::info!(
            "History saved: {} ({} rows)",
            self.path.display(),
            dataset.len()
        );
        Ok(())
    }
}

/// Write the derived series: `date,<CCY>_<DOMESTIC>,...`
pub fn save_series(path: &Path, series: &CrossRateSeries) -> Result<()> {
    let mut header = vec![DATE_COLUMN.to_string()];
    header.extend(series.column_names());

    let rows = series.rows().map(|(date, cells)| {
        let mut record = Vec::with_capacity(cells.len() + 1);
        record.push(date.format(DATE_FORMAT).to_string());
        record.extend(cells.iter().map(Value::to_string));
        record
    });

    write_atomic(path, &header, rows)?;
    log::info!("Cross rates saved: {} ({} rows)", path.display(), series.len());
    Ok(())
}

fn write_atomic<I>(path: &Path, header: &[String], rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| FxError::storage(parent, e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let written: Result<()> = (|| {
        let mut wtr = Writer::from_path(&tmp).map_err(|e| FxError::storage(&tmp, e))?;
        wtr.write_record(header)
            .map_err(|e| FxError::storage(&tmp, e))?;
        for row in rows {
            wtr.write_record(&row).map_err(|e| FxError::storage(&tmp, e))?;
        }
        wtr.flush().map_err(|e| FxError::storage(&tmp, e))?;
        Ok(())
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, path).map_err(|e| FxError::storage(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RateDate;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn ccy(code: &str) -> CurrencyCode {
        CurrencyCode::from_code(code).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> RateDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.csv"));
        let ds = store.load().unwrap();
        assert!(ds.is_empty());
        assert!(ds.columns().is_empty());
    }

    #[test]
    fn test_load_normalizes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.csv");
        fs::write(
            &path,
            "date,usd,Pln\n\
             2024-01-03 00:00:00,1.09,4.36\n\
             2024-01-01,1.10,\n\
             2024-01-02,abc,4.34\n",
        )
        .unwrap();

        let ds = HistoryStore::new(&path).load().unwrap();
        assert_eq!(ds.columns(), &[ccy("USD"), ccy("PLN")]);
        let dates: Vec<RateDate> = ds.dates().collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]);
        assert_eq!(ds.get(date(2024, 1, 1), ccy("PLN")), Value::Missing);
        assert_eq!(ds.get(date(2024, 1, 2), ccy("USD")), Value::Missing);
        assert_eq!(ds.get(date(2024, 1, 3), ccy("PLN")), Value::Present(4.36));
    }

    #[test]
    fn test_unusable_date_is_storage_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let contents = "date,PLN,USD\n2024-01-01,4.3,1.1\n01/02/2024,4.31,1.11\n";
        fs::write(&path, contents).unwrap();

        let err = HistoryStore::new(&path).load().unwrap_err();
        assert!(matches!(err, FxError::Storage { ref reason, .. } if reason.contains("01/02/2024")));
        assert!(err.is_fatal());
        assert_eq!(fs::read_to_string(&path).unwrap(), contents);
    }

    #[test]
    fn test_duplicate_dates_fold() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.csv");
        fs::write(&path, "date,USD,GBP\n2024-01-01,1.10,0.86\n2024-01-01,1.12,\n").unwrap();

        let ds = HistoryStore::new(&path).load().unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.get(date(2024, 1, 1), ccy("USD")), Value::Present(1.12));
        assert_eq!(ds.get(date(2024, 1, 1), ccy("GBP")), Value::Present(0.86));
    }

    #[test]
    fn test_save_load_save_is_stable() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("nested").join("history.csv"));

        let mut ds = HistoricalDataset::new();
        ds.set(date(2024, 1, 2), ccy("USD"), Value::Present(1.0956));
        ds.set(date(2024, 1, 1), ccy("USD"), Value::Present(1.1));
        ds.set(date(2024, 1, 1), ccy("JPY"), Value::Present(156.33));

        store.save(&ds).unwrap();
        let first = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            first,
            "date,USD,JPY\n2024-01-01,1.1,156.33\n2024-01-02,1.0956,\n"
        );

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, ds);
        store.save(&reloaded).unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), first);
    }

    #[test]
    fn test_bad_header_is_storage_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.csv");
        fs::write(&path, "when,USD\n2024-01-01,1.1\n").unwrap();
        assert!(matches!(
            HistoryStore::new(&path).load(),
            Err(FxError::Storage { .. })
        ));
    }
}
