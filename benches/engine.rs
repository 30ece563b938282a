//! Benchmarks for the streaming strategy pipeline.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use candlestrat::prelude::*;

/// Generate realistic deterministic bars
fn generate_bars(n: usize) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0;

    for i in 0..n {
        let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 1.0;
        let volatility = 2.0 + ((i * 3) % 10) as f64 / 5.0;

        let o = price;
        let c = price + change;
        let h = o.max(c) + volatility * 0.5;
        let l = o.min(c) - volatility * 0.5;
        let volume = 500.0 + ((i * 31) % 1_500) as f64;

        bars.push(Bar::new(i as i64, o, h, l, c, volume));
        price = c;
    }

    bars
}

fn bench_single_detector(c: &mut Criterion) {
    let bars = generate_bars(1_000);
    let mut window = BarWindow::unbounded();
    for b in &bars {
        window.push(*b).unwrap();
    }

    let mut group = c.benchmark_group("single_detector");
    for kind in [
        PatternKind::Doji,
        PatternKind::Engulfing,
        PatternKind::MorningStar,
    ] {
        let detector = Detector::with_defaults(kind);
        group.bench_with_input(BenchmarkId::from_parameter(kind.name()), &detector, |b, d| {
            b.iter(|| black_box(d.detect(&window)))
        });
    }
    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_pipeline");
    for n in [1_000usize, 10_000] {
        let bars = generate_bars(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| {
                let mut engine = EngineBuilder::new()
                    .with_all_defaults()
                    .pivots(PivotConfig::default())
                    .build()
                    .unwrap();
                engine.run(bars).unwrap();
                black_box(engine.ledger().total_trades())
            })
        });
    }
    group.finish();
}

fn bench_parallel_sweep(c: &mut Criterion) {
    let bars = generate_bars(2_000);
    let configs: Vec<StrategyConfig> = (1..=8)
        .map(|consecutive| StrategyConfig {
            consecutive_bars: consecutive,
            ..StrategyConfig::default()
        })
        .collect();

    c.bench_function("parallel_sweep_8_configs", |b| {
        b.iter(|| {
            let (results, errors) = run_parallel(&configs, &bars);
            assert!(errors.is_empty());
            black_box(results.len())
        })
    });
}

criterion_group!(
    benches,
    bench_single_detector,
    bench_full_pipeline,
    bench_parallel_sweep
);
criterion_main!(benches);
