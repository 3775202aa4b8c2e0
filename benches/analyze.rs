//! Benchmarks for the structural analysis pipeline.

use chanscan::prelude::*;
use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Generate realistic deterministic bars.
fn generate_bars(n: usize) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0;

    for i in 0..n {
        let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 1.0; // Deterministic "random"
        let volatility = 2.0 + ((i * 3) % 10) as f64 / 5.0;

        let open = price;
        let close = price + change;
        let high = open.max(close) + volatility * 0.5;
        let low = open.min(close) - volatility * 0.5;

        bars.push(Bar::new(
            Utc.timestamp_opt(1_700_000_000 + i as i64 * 60, 0).unwrap(),
            open,
            high,
            low,
            close,
            1_000.0 + (i % 500) as f64,
        ));
        price = close;
    }

    bars
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");
    for n in [500, 2_000, 10_000] {
        let bars = generate_bars(n);
        let analyzer = Analyzer::new();
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| black_box(analyzer.analyze(black_box(bars))))
        });
    }
    group.finish();
}

fn bench_stages(c: &mut Criterion) {
    let bars = generate_bars(2_000);
    let merged = merge_bars(&bars);
    let fractals = find_fractals(&merged);
    let strokes = build_strokes(&fractals, 4, 0.0);

    c.bench_function("merge_2000", |b| {
        b.iter(|| black_box(merge_bars(black_box(&bars))))
    });
    c.bench_function("fractals_2000", |b| {
        b.iter(|| black_box(find_fractals(black_box(&merged))))
    });
    c.bench_function("strokes_2000", |b| {
        b.iter(|| black_box(build_strokes(black_box(&fractals), 4, 0.0)))
    });
    c.bench_function("centers_2000", |b| {
        b.iter(|| black_box(find_centers(black_box(&strokes))))
    });
}

fn bench_sliding_window(c: &mut Criterion) {
    // The live monitor re-runs the pipeline over a trailing window per
    // tick; this approximates that access pattern.
    let bars = generate_bars(4_000);
    let analyzer = Analyzer::new();
    c.bench_function("window_500_x8", |b| {
        b.iter(|| {
            for start in (0..4_000 - 500).step_by(500) {
                black_box(analyzer.analyze(black_box(&bars[start..start + 500])));
            }
        })
    });
}

criterion_group!(benches, bench_full_pipeline, bench_stages, bench_sliding_window);
criterion_main!(benches);
