use criterion::{criterion_group, criterion_main, Criterion, BenchmarkId, Throughput};
use workpool::{
    cursor::{ForwardCursor, StreamCursor},
    pool::{Config, WorkerPool},
    threads::ThreadCount,
};
use std::{
    collections::LinkedList,
    hint::black_box,
    sync::atomic::{AtomicU64, Ordering},
};

// Benchmark 1: Submit overhead
fn bench_submit_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_overhead");

    for size in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));

        // с ожиданием каждого handle
        group.bench_with_input(
            BenchmarkId::new("with_handle", size),
            &size,
            |b, &size| {
                let pool = WorkerPool::with_config(Config::default()).unwrap();
                b.iter(|| {
                    let handles: Vec<_> = (0..size)
                        .map(|i| pool.submit(move |_| black_box(i)).unwrap())
                        .collect();
                    for handle in handles {
                        black_box(handle.join().unwrap());
                    }
                });
            },
        );

        // handle выброшен, один барьер в конце
        group.bench_with_input(
            BenchmarkId::new("join_all", size),
            &size,
            |b, &size| {
                let pool = WorkerPool::with_config(Config::default()).unwrap();
                b.iter(|| {
                    for i in 0..size {
                        let _ = pool.submit(move |_| black_box(i)).unwrap();
                    }
                    pool.join_all();
                });
            },
        );

        // синхронный режим: чистая стоимость упаковки задачи
        group.bench_with_input(
            BenchmarkId::new("inline", size),
            &size,
            |b, &size| {
                let pool = WorkerPool::with_config(Config::sequential()).unwrap();
                b.iter(|| {
                    for i in 0..size {
                        black_box(pool.submit(move |_| black_box(i)).unwrap().join().unwrap());
                    }
                });
            },
        );
    }

    group.finish();
}

// Benchmark 2: for-each by cursor category
fn bench_cursor_categories(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor_categories");
    group.sample_size(20);

    let n = 100_000usize;
    group.throughput(Throughput::Elements(n as u64));

    let pool = WorkerPool::with_config(Config::default()).unwrap();
    let vec: Vec<u64> = (0..n as u64).collect();
    let list: LinkedList<u64> = vec.iter().copied().collect();

    group.bench_function("random_access", |b| {
        b.iter(|| {
            let sum = AtomicU64::new(0);
            pool.par_for_each(&vec, |_, x| {
                sum.fetch_add(black_box(*x), Ordering::Relaxed);
            }, n).unwrap();
            black_box(sum.into_inner())
        });
    });

    group.bench_function("forward_walk", |b| {
        b.iter(|| {
            let sum = AtomicU64::new(0);
            pool.par_for_each(ForwardCursor::new(list.iter()), |_, x| {
                sum.fetch_add(black_box(*x), Ordering::Relaxed);
            }, 0).unwrap();
            black_box(sum.into_inner())
        });
    });

    group.bench_function("forward_hint", |b| {
        b.iter(|| {
            let sum = AtomicU64::new(0);
            pool.par_for_each(ForwardCursor::new(list.iter()), |_, x| {
                sum.fetch_add(black_box(*x), Ordering::Relaxed);
            }, n).unwrap();
            black_box(sum.into_inner())
        });
    });

    group.bench_function("single_pass", |b| {
        b.iter(|| {
            let sum = AtomicU64::new(0);
            pool.par_for_each(StreamCursor::new(vec.iter()), |_, x| {
                sum.fetch_add(black_box(*x), Ordering::Relaxed);
            }, n).unwrap();
            black_box(sum.into_inner())
        });
    });

    group.finish();
}

// Benchmark 3: Thread scaling
fn bench_thread_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("thread_scaling");
    group.sample_size(20);

    let n = 1_000_000usize;
    group.throughput(Throughput::Elements(n as u64));

    for threads in [1usize, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::from_parameter(threads),
            &threads,
            |b, &threads| {
                let pool = WorkerPool::from_request(ThreadCount::Exactly(threads)).unwrap();
                let partial: Vec<AtomicU64> = (0..pool.config().actual_threads())
                    .map(|_| AtomicU64::new(0))
                    .collect();
                b.iter(|| {
                    pool.par_for_each_index(n, |worker, i| {
                        partial[worker].fetch_add(black_box(i as u64), Ordering::Relaxed);
                    }).unwrap();
                });
            },
        );
    }

    group.finish();
}

// Benchmark 4: chunks_per_worker
fn bench_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunks_per_worker");
    group.sample_size(20);

    let input: Vec<u64> = (0..500_000).collect();
    let mut output = vec![0u64; input.len()];
    group.throughput(Throughput::Elements(input.len() as u64));

    for chunks in [1usize, 3, 8, 32] {
        let pool = WorkerPool::with_config(Config::default().with_chunks_per_worker(chunks)).unwrap();
        group.bench_function(BenchmarkId::from_parameter(chunks), |b| {
            b.iter(|| {
                pool.par_scatter(&input, &mut output, |_, x| black_box(x.wrapping_mul(*x))).unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_submit_overhead,
    bench_cursor_categories,
    bench_thread_scaling,
    bench_chunking,
);
criterion_main!(benches);
