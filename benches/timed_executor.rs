//! Timed executor overhead
//!
//! Measures the harness loop itself with a no-op workload, so its cost can be
//! compared against a real unit.

use audiomark_bench::clock::{MonotonicClock, WallClock};
use audiomark_bench::harness::run_timed;
use audiomark_bench::{Workload, WorkloadFailure};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

struct Noop;

impl Workload for Noop {
    fn initialize(&mut self) -> Result<(), WorkloadFailure> {
        Ok(())
    }

    fn run_one_unit(&mut self) -> Result<(), WorkloadFailure> {
        Ok(())
    }

    fn release(&mut self) {}
}

fn bench_run_timed(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_timed_noop");
    let monotonic = MonotonicClock::new();

    for iterations in [1u32, 64, 4096] {
        group.bench_with_input(
            BenchmarkId::new("monotonic", iterations),
            &iterations,
            |bencher, &n| bencher.iter(|| black_box(run_timed(&mut Noop, &monotonic, n))),
        );
        group.bench_with_input(
            BenchmarkId::new("wall", iterations),
            &iterations,
            |bencher, &n| bencher.iter(|| black_box(run_timed(&mut Noop, &WallClock, n))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_run_timed);
criterion_main!(benches);
