use bounded_pool::{BoundedPool, Pool, PoolConfiguration};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use std::thread;

fn buffer_pool(init_cap: usize, max_cap: usize) -> BoundedPool<Vec<u8>> {
    BoundedPool::new(
        PoolConfiguration::with_drop_close(|| Ok(vec![0u8; 4096]))
            .with_init_cap(init_cap)
            .with_max_cap(max_cap),
    )
    .unwrap()
}

fn get_put(c: &mut Criterion) {
    let pool = buffer_pool(8, 8);

    c.bench_function("get_put_idle", |b| {
        b.iter(|| {
            let buf = pool.get().unwrap();
            pool.put(black_box(buf)).unwrap();
        })
    });

    c.bench_function("guard_idle", |b| {
        b.iter(|| {
            let buf = pool.acquire().unwrap();
            black_box(buf.len());
        })
    });
}

fn overflow(c: &mut Criterion) {
    let pool = buffer_pool(1, 1);

    c.bench_function("get_put_overflow", |b| {
        b.iter(|| {
            let first = pool.get().unwrap();
            let second = pool.get().unwrap();
            pool.put(first).unwrap();
            pool.put(second).unwrap();
        })
    });
}

fn contended(c: &mut Criterion) {
    let pool = Arc::new(buffer_pool(4, 16));

    c.bench_function("get_put_4_threads", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let pool = Arc::clone(&pool);
                    thread::spawn(move || {
                        for _ in 0..100 {
                            let buf = pool.get().unwrap();
                            pool.put(buf).unwrap();
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        })
    });
}

criterion_group!(benches, get_put, overflow, contended);
criterion_main!(benches);
