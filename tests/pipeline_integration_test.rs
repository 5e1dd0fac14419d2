//! End-to-end flows against temporary stores

use approx::assert_relative_eq;
use chrono::NaiveDate;
use rusty_fxrates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn ccy(code: &str) -> CurrencyCode {
    CurrencyCode::from_code(code).unwrap()
}

fn config_in(dir: &Path) -> Config {
    Config {
        data_dir: dir.join("data"),
        dashboard_file: dir.join("dashboard.html"),
        ..Config::default()
    }
}

const WINDOW_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gesmes:Envelope xmlns:gesmes="http://www.gesmes.org/xml/2002-08-01" xmlns="http://www.ecb.int/vocabulary/2002-08-01/eurofxref">
  <gesmes:subject>Reference rates</gesmes:subject>
  <Cube>
    <Cube time="2024-01-03">
      <Cube currency="USD" rate="1.0919"/>
      <Cube currency="PLN" rate="4.3660"/>
      <Cube currency="GBP" rate="0.86350"/>
    </Cube>
    <Cube time="2024-01-02">
      <Cube currency="USD" rate="1.0956"/>
      <Cube currency="PLN" rate="4.3515"/>
      <Cube currency="GBP" rate="0.86750"/>
    </Cube>
  </Cube>
</gesmes:Envelope>"#;

#[test]
fn test_scenario_a_single_observation() {
    let batch = ObservationBatch::single(
        RateObservation::new(date("2024-01-02"))
            .with_rate(ccy("PLN"), 4.35)
            .with_rate(ccy("USD"), 1.10),
    );
    let (history, report) = merge(HistoricalDataset::new(), &batch, MergeStrategy::UpdateOverlapping);
    assert_eq!(report.inserted, vec![date("2024-01-02")]);

    let only_eur = derive(&history, &[CurrencyCode::EUR], ccy("PLN")).unwrap();
    assert!(only_eur.is_empty());

    let series = derive(&history, &[CurrencyCode::EUR, ccy("USD")], ccy("PLN")).unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series.column_names(), vec!["USD_PLN".to_string()]);
    let usd = series.get(date("2024-01-02"), ccy("USD")).as_f64().unwrap();
    assert_relative_eq!(usd, 4.35 / 1.10, epsilon = 1e-12);
    assert_relative_eq!(usd, 3.9545, epsilon = 1e-4);
}

#[test]
fn test_scenario_b_backfill_updates_and_fills_gap() {
    let mut history = HistoricalDataset::new();
    history.set(date("2024-01-01"), ccy("USD"), Value::from(1.10));
    history.set(date("2024-01-01"), ccy("PLN"), Value::from(4.30));
    history.set(date("2024-01-03"), ccy("USD"), Value::from(1.09));
    history.set(date("2024-01-03"), ccy("PLN"), Value::from(4.36));

    let batch: ObservationBatch = vec![
        RateObservation::new(date("2024-01-01")).with_rate(ccy("USD"), 1.105),
        RateObservation::new(date("2024-01-02"))
            .with_rate(ccy("USD"), 1.095)
            .with_rate(ccy("PLN"), 4.35),
        RateObservation::new(date("2024-01-03"))
            .with_rate(ccy("USD"), 1.09)
            .with_rate(ccy("PLN"), 4.36),
    ]
    .into_iter()
    .collect();

    let (merged, report) = merge(history, &batch, MergeStrategy::UpdateOverlapping);

    let dates: Vec<NaiveDate> = merged.dates().collect();
    assert_eq!(dates, vec![date("2024-01-01"), date("2024-01-02"), date("2024-01-03")]);
    assert_eq!(merged.get(date("2024-01-01"), ccy("USD")), Value::from(1.105));
    assert_eq!(merged.get(date("2024-01-01"), ccy("PLN")), Value::from(4.30));
    assert_eq!(merged.get(date("2024-01-03"), ccy("USD")), Value::from(1.09));
    assert_eq!(report.inserted, vec![date("2024-01-02")]);
    assert_eq!(report.cells_changed, 1 + 2);
}

#[test]
fn test_daily_path_keeps_existing_row() {
    let dir = tempdir().unwrap();
    let pipeline = RatePipeline::new(config_in(dir.path())).unwrap();

    let first = StaticFeed::new(vec![RawObservation::new("2024-01-05")
        .with_rate("PLN", "4.34")
        .with_rate("USD", "1.09")]);
    pipeline.run_daily(&first).unwrap();

    let corrected = StaticFeed::new(vec![RawObservation::new("2024-01-05")
        .with_rate("PLN", "4.34")
        .with_rate("USD", "1.20")]);
    let summary = pipeline.run_daily(&corrected).unwrap();

    assert_eq!(summary.merge.skipped, vec![date("2024-01-05")]);
    assert!(!summary.history_written);
    let history = pipeline.store().load().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history.get(date("2024-01-05"), ccy("USD")), Value::from(1.09));
}

#[test]
fn test_backfill_after_daily_from_xml() {
    let dir = tempdir().unwrap();
    let pipeline = RatePipeline::new(config_in(dir.path())).unwrap();

    let daily = StaticFeed::new(vec![RawObservation::new("2024-01-03")
        .with_rate("PLN", "4.3600")
        .with_rate("USD", "1.0900")]);
    pipeline.run_daily(&daily).unwrap();

    let window = StaticFeed::from_xml(WINDOW_XML).unwrap();
    let summary = pipeline.run_backfill(&window, false).unwrap();

    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.rows_after, 2);
    assert_eq!(summary.merge.inserted, vec![date("2024-01-02")]);
    assert_eq!(summary.merge.updated, vec![date("2024-01-03")]);
    assert_eq!(summary.merge.new_columns, vec![ccy("GBP")]);
    assert!(summary.history_written);
    assert!(summary.dashboard.is_none());

    let history = pipeline.store().load().unwrap();
    assert_eq!(history.get(date("2024-01-03"), ccy("USD")), Value::from(1.0919));

    // EUR resolves through the reference currency, GBP arrived with the window
    let series = pipeline.derive_only().unwrap();
    assert_eq!(series.len(), 2);
    let eur = series.get(date("2024-01-02"), CurrencyCode::EUR).as_f64().unwrap();
    assert_relative_eq!(eur, 4.3515, epsilon = 1e-12);
    let gbp = series.get(date("2024-01-03"), ccy("GBP")).as_f64().unwrap();
    assert_relative_eq!(gbp, 4.3660 / 0.86350, epsilon = 1e-12);
    assert!(series.get(date("2024-01-02"), CurrencyCode::CHF).is_missing());

    let rerun = pipeline.run_backfill(&window, false).unwrap();
    assert!(rerun.merge.is_noop());
    assert!(!rerun.history_written);
}

#[test]
fn test_stored_files_are_stable() {
    let dir = tempdir().unwrap();
    let pipeline = RatePipeline::new(config_in(dir.path())).unwrap();
    let window = StaticFeed::from_xml(WINDOW_XML).unwrap();
    pipeline.run_backfill(&window, false).unwrap();

    let history_path = pipeline.config().history_path();
    let series_path = pipeline.config().series_path();
    let history_bytes = fs::read_to_string(&history_path).unwrap();
    let series_bytes = fs::read_to_string(&series_path).unwrap();

    let mut lines = history_bytes.lines();
    // Columns are ordered as first seen, cells within an observation by code
    assert_eq!(lines.next(), Some("date,GBP,PLN,USD"));
    assert_eq!(lines.next(), Some("2024-01-02,0.8675,4.3515,1.0956"));
    assert!(series_bytes.starts_with("date,EUR_PLN,USD_PLN,GBP_PLN\n"));

    pipeline.rederive(false).unwrap();
    let store = HistoryStore::new(&history_path);
    store.save(&store.load().unwrap()).unwrap();

    assert_eq!(fs::read_to_string(&history_path).unwrap(), history_bytes);
    assert_eq!(fs::read_to_string(&series_path).unwrap(), series_bytes);
}

#[test]
fn test_division_tolerance_end_to_end() {
    let dir = tempdir().unwrap();
    let pipeline = RatePipeline::new(config_in(dir.path())).unwrap();

    let feed = StaticFeed::new(vec![
        RawObservation::new("2024-01-02")
            .with_rate("PLN", "4.35")
            .with_rate("USD", "0")
            .with_rate("GBP", "0.87"),
        RawObservation::new("2024-01-03")
            .with_rate("PLN", "4.36")
            .with_rate("USD", "n/a"),
        RawObservation::new("2024-01-04")
            .with_rate("PLN", "")
            .with_rate("USD", "1.09"),
        RawObservation::default().with_rate("USD", "1.10"),
    ]);

    let summary = pipeline.run_backfill(&feed, true).unwrap();
    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.coerced, 3);
    assert_eq!(summary.rows_after, 3);

    let series = pipeline.derive_only().unwrap();
    assert!(series.get(date("2024-01-02"), ccy("USD")).is_missing());
    assert!(series.get(date("2024-01-03"), ccy("USD")).is_missing());
    assert!(series.get(date("2024-01-04"), ccy("USD")).is_missing());
    let eur = series.get(date("2024-01-03"), CurrencyCode::EUR).as_f64().unwrap();
    assert_relative_eq!(eur, 4.36, epsilon = 1e-12);

    let html = fs::read_to_string(dir.path().join("dashboard.html")).unwrap();
    assert!(html.contains("USD PLN"));
    assert!(!html.contains("NaN"));
}

#[test]
fn test_unreadable_store_is_fatal() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    fs::create_dir_all(&config.data_dir).unwrap();
    fs::write(config.history_path(), "when,USD\n2024-01-01,1.1\n").unwrap();

    let pipeline = RatePipeline::new(config).unwrap();
    let err = pipeline.rederive(false).unwrap_err();
    assert!(matches!(err, FxError::Storage { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_daily_run_never_drops_unreadable_rows() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    fs::create_dir_all(&config.data_dir).unwrap();
    let contents = "date,PLN,USD\n2024-01-01,4.3,1.1\n01/02/2024,4.31,1.11\n";
    fs::write(config.history_path(), contents).unwrap();

    let pipeline = RatePipeline::new(config).unwrap();
    let feed = StaticFeed::new(vec![RawObservation::new("2024-01-03")
        .with_rate("PLN", "4.32")
        .with_rate("USD", "1.12")]);

    let err = pipeline.run_daily(&feed).unwrap_err();
    assert!(matches!(err, FxError::Storage { .. }));
    assert_eq!(fs::read_to_string(pipeline.config().history_path()).unwrap(), contents);
    assert!(!pipeline.config().series_path().exists());
}
