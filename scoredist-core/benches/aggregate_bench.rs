//! Criterion benchmarks for the chart statistics hot path.
//!
//! Benchmarks:
//! 1. Aggregation of raw pairs at the three common step sizes
//! 2. Full chart statistics assembly (aggregate + percentiles + thresholds + colors)
//! 3. Color lookup over a dense sweep of values

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use scoredist_core::{
    aggregate, color_at, compute_chart_statistics, Block, ChartRequest, ExamYear, RawPair,
    ScoreDomain, StepDecision, Subject,
};

// ── Helpers ──────────────────────────────────────────────────────────

/// A bell-shaped table of raw scores in hundredths over `[0, max]`.
fn make_pairs(max: f64) -> Vec<RawPair> {
    let n = (max * 100.0) as usize;
    (0..=n)
        .map(|i| {
            let score = i as f64 / 100.0;
            let z = (score - max * 0.6) / (max * 0.15);
            let count = (10_000.0 * (-0.5 * z * z).exp()) as u64;
            RawPair::new(score, count)
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    let pairs = make_pairs(10.0);

    for step in [0.05, 0.2, 0.25] {
        group.bench_with_input(BenchmarkId::new("subject", step), &step, |b, &step| {
            b.iter(|| aggregate(black_box(&pairs), step, 10.0))
        });
    }

    group.finish();
}

fn bench_chart_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("chart_statistics");

    let subject_pairs = make_pairs(10.0);
    let subject = ChartRequest::new(ExamYear::new(2024), Subject::Toan.into(), StepDecision::Step(0.2));
    group.bench_function("subject_step_0.2", |b| {
        b.iter(|| compute_chart_statistics(black_box(&subject), black_box(&subject_pairs)))
    });

    let block_pairs = make_pairs(30.0);
    let block = ChartRequest::new(ExamYear::new(2019), Block::A.into(), StepDecision::Step(0.25));
    group.bench_function("block_step_0.25", |b| {
        b.iter(|| compute_chart_statistics(black_box(&block), black_box(&block_pairs)))
    });

    group.finish();
}

fn bench_color(c: &mut Criterion) {
    let domain = ScoreDomain::new(2.99, 7.83);
    c.bench_function("color_at_1000", |b| {
        b.iter(|| {
            for i in 0..1000 {
                black_box(color_at(i as f64 / 100.0, domain));
            }
        })
    });
}

criterion_group!(benches, bench_aggregate, bench_chart_statistics, bench_color);
criterion_main!(benches);
