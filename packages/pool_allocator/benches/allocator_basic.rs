//! Basic benchmarks for the `pool_allocator` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::time::Instant;

use alloc_tracker::Allocator;
use criterion::{Criterion, criterion_group, criterion_main};
use pool_allocator::PoolAllocator;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("allocator_basic");

    let allocs_op = allocs.operation("allocate_deallocate_pair");
    group.bench_function("allocate_deallocate_pair", |b| {
        b.iter_custom(|iters| {
            let mut allocator = PoolAllocator::<u64>::new().unwrap();

            let warmup = allocator.allocate(1).unwrap();
            // SAFETY: The pointer was obtained from this allocator and not yet returned.
            unsafe { allocator.deallocate(warmup, 1).unwrap() };

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let slot = black_box(allocator.allocate(1).unwrap());
                // SAFETY: The pointer was obtained from this allocator and not yet returned.
                unsafe { allocator.deallocate(slot, 1).unwrap() };
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("bounded_allocate_one");
    group.bench_function("bounded_allocate_one", |b| {
        b.iter_custom(|iters| {
            // A bounded allocator pre-allocates everything, so the measured path never
            // touches the page source.
            let mut allocator = PoolAllocator::<u64, 1>::new().unwrap();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let slot = black_box(allocator.allocate(1).unwrap());
                // SAFETY: The pointer was obtained from this allocator and not yet returned.
                unsafe { allocator.deallocate(slot, 1).unwrap() };
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
