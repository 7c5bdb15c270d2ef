//! Benchmarks for the Monte Carlo engine

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use driftflow::models::{RngNormals, Simulation, SimulationParameters};

fn params() -> SimulationParameters {
    SimulationParameters {
        current_price: 100.0,
        mean: 0.0004,
        volatility: 0.018,
        time_step: 1.0 / 252.0,
        iterations: 100_000,
    }
}

fn benchmark_sequential(c: &mut Criterion) {
    let engine = Simulation::default();
    let params = params();

    c.bench_function("simulate_sequential_100k", |b| {
        b.iter(|| engine.run(black_box(&params), &mut RngNormals::seeded(7)))
    });
}

fn benchmark_parallel(c: &mut Criterion) {
    let engine = Simulation::default();
    let params = params();

    c.bench_function("simulate_parallel_100k", |b| {
        b.iter(|| engine.run_parallel(black_box(&params), 7, 8))
    });
}

criterion_group!(benches, benchmark_sequential, benchmark_parallel);
criterion_main!(benches);
