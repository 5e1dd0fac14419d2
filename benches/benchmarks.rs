use criterion::{black_box, criterion_group, criterion_main, Criterion};
use chrono::{Duration, NaiveDate};
use rusty_fxrates::{
    currency::CurrencyCode,
    data::{derive, merge, HistoricalDataset, MergeStrategy},
    observation::{ObservationBatch, RateObservation},
};

const CODES: [&str; 8] = ["PLN", "USD", "GBP", "CHF", "JPY", "CZK", "SEK", "NOK"];

fn batch(days: i64, offset: i64) -> ObservationBatch {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let codes: Vec<CurrencyCode> = CODES
        .iter()
        .map(|c| CurrencyCode::from_code(c).unwrap())
        .collect();

    (0..days)
        .map(|i| {
            codes.iter().enumerate().fold(
                RateObservation::new(start + Duration::days(offset + i)),
                |obs, (k, code)| obs.with_rate(*code, 1.0 + (i as f64 * 0.001) + k as f64),
            )
        })
        .collect()
}

fn benchmark_backfill_merge(c: &mut Criterion) {
    let (history, _) = merge(
        HistoricalDataset::new(),
        &batch(2500, 0),
        MergeStrategy::UpdateOverlapping,
    );
    let window = batch(90, 2450);

    c.bench_function("merge_90d_window_into_10y", |b| {
        b.iter(|| {
            let (merged, _) = merge(
                black_box(history.clone()),
                black_box(&window),
                MergeStrategy::UpdateOverlapping,
            );
            merged
        });
    });
}

fn benchmark_daily_insert(c: &mut Criterion) {
    let (history, _) = merge(
        HistoricalDataset::new(),
        &batch(2500, 0),
        MergeStrategy::UpdateOverlapping,
    );
    let daily = batch(1, 2500);

    c.bench_function("insert_if_absent_daily", |b| {
        b.iter(|| {
            let (merged, _) = merge(
                black_box(history.clone()),
                black_box(&daily),
                MergeStrategy::InsertIfAbsent,
            );
            merged
        });
    });
}

fn benchmark_derive(c: &mut Criterion) {
    let (history, _) = merge(
        HistoricalDataset::new(),
        &batch(2500, 0),
        MergeStrategy::UpdateOverlapping,
    );
    let targets = [
        CurrencyCode::EUR,
        CurrencyCode::USD,
        CurrencyCode::GBP,
        CurrencyCode::CHF,
    ];

    c.bench_function("derive_4_targets_10y", |b| {
        b.iter(|| derive(black_box(&history), &targets, CurrencyCode::PLN));
    });
}

criterion_group!(
    benches,
    benchmark_backfill_merge,
    benchmark_daily_insert,
    benchmark_derive
);
criterion_main!(benches);
