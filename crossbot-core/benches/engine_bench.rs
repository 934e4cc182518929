//! Criterion benchmarks for the hot paths.
//!
//! 1. Indicator preparation on a long series
//! 2. Bar loop over prepared bars with the crossover strategy

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use crossbot_core::domain::Bar;
use crossbot_core::engine::{BacktestEngine, EngineConfig};
use crossbot_core::indicators::{prepare, IndicatorParams};
use crossbot_core::strategy::SmaAtrStrategy;

fn make_bars(n: usize) -> Vec<Bar> {
    let start = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.01).sin() * 10.0 + (i as f64 * 0.003).cos() * 5.0;
            let open = close - 0.3;
            Bar::new(
                start + Duration::minutes(i as i64),
                open,
                close + 1.5,
                close - 1.5,
                close,
                1_000.0,
            )
        })
        .collect()
}

fn bench_prepare(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepare");
    for n in [10_000, 100_000] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| prepare(black_box(bars), &IndicatorParams::default()))
        });
    }
    group.finish();
}

fn bench_engine_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_loop");
    let strategy = SmaAtrStrategy::new(0.03);
    for n in [10_000, 100_000] {
        let prepared = match prepare(&make_bars(n), &IndicatorParams::default()) {
            Ok(p) => p,
            Err(e) => panic!("bench data failed to prepare: {e}"),
        };
        group.bench_with_input(BenchmarkId::from_parameter(n), &prepared, |b, prepared| {
            b.iter(|| {
                let mut engine = BacktestEngine::new(EngineConfig::new(10_000.0, 0.001))
                    .expect("valid config");
                engine.run(black_box(prepared), &strategy)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_prepare, bench_engine_loop);
criterion_main!(benches);
