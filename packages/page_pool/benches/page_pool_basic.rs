//! Basic benchmarks for the `page_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::alloc::Layout;
use std::hint::black_box;
use std::iter;
use std::time::Instant;

use alloc_tracker::Allocator;
use criterion::{Criterion, criterion_group, criterion_main};
use page_pool::PagePool;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("page_pool_basic");

    let allocs_op = allocs.operation("build_empty");
    group.bench_function("build_empty", |b| {
        b.iter_custom(|iters| {
            let layout = Layout::new::<u64>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(
                    PagePool::builder().layout(layout).build().unwrap(),
                ));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("allocate_one");
    group.bench_function("allocate_one", |b| {
        b.iter_custom(|iters| {
            let layout = Layout::new::<u64>();

            let mut pools =
                iter::repeat_with(|| PagePool::builder().layout(layout).build().unwrap())
                    .take(usize::try_from(iters).unwrap())
                    .collect::<Vec<_>>();

            // Pre-grow each pool so only the hot path is measured.
            for pool in &mut pools {
                let warmup = pool.allocate().unwrap();
                // SAFETY: The address was obtained from this pool and not yet returned.
                unsafe { pool.deallocate(warmup).unwrap() };
            }

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &mut pools {
                _ = black_box(pool.allocate().unwrap());
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("allocate_deallocate_pair");
    group.bench_function("allocate_deallocate_pair", |b| {
        b.iter_custom(|iters| {
            let layout = Layout::new::<u64>();

            let mut pool = PagePool::builder().layout(layout).build().unwrap();

            let warmup = pool.allocate().unwrap();
            // SAFETY: The address was obtained from this pool and not yet returned.
            unsafe { pool.deallocate(warmup).unwrap() };

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let slot = black_box(pool.allocate().unwrap());
                // SAFETY: The address was obtained from this pool and not yet returned.
                unsafe { pool.deallocate(slot).unwrap() };
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
