//! Criterion benchmarks for RegimeLab hot paths.
//!
//! Benchmarks:
//! 1. Full simulation loop (regime strategy over enriched candles)
//! 2. Indicator enrichment
//! 3. Regime classification per candle

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use regimelab_core::domain::Candle;
use regimelab_core::indicators::{enrich, IndicatorParams};
use regimelab_core::regime::{classify_at, RegimeThresholds};
use regimelab_core::{run_config, StrategyConfig};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_candles(n: usize) -> Vec<Candle> {
    let base = chrono::NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            let x = i as f64;
            let close = 100.0 + (x * 0.1).sin() * 10.0 + (x * 0.013).sin() * 25.0;
            let open = close - 0.3;
            Candle::new(
                base + chrono::Duration::hours(i as i64),
                open,
                close + 1.5,
                open - 1.5,
                close,
                1_000.0 + (i % 500) as f64,
            )
        })
        .collect()
}

fn enriched(n: usize) -> Vec<Candle> {
    let mut candles = make_candles(n);
    enrich(&mut candles, &IndicatorParams::default());
    candles
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    let config = StrategyConfig::default();
    for n in [1_000usize, 10_000] {
        let candles = enriched(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &candles, |b, candles| {
            b.iter(|| run_config(black_box(candles), &config))
        });
    }
    group.finish();
}

fn bench_enrich(c: &mut Criterion) {
    let raw = make_candles(10_000);
    let params = IndicatorParams::default();
    c.bench_function("enrich_10k", |b| {
        b.iter(|| {
            let mut candles = raw.clone();
            enrich(black_box(&mut candles), &params);
            candles
        })
    });
}

fn bench_classify(c: &mut Criterion) {
    let candles = enriched(2_000);
    let thresholds = RegimeThresholds::default();
    c.bench_function("classify_2k", |b| {
        b.iter(|| {
            (0..candles.len())
                .map(|i| classify_at(black_box(&candles), i, &thresholds))
                .count()
        })
    });
}

criterion_group!(benches, bench_simulation, bench_enrich, bench_classify);
criterion_main!(benches);
