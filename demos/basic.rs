//! Basic usage examples for BoundedPool

use bounded_pool::{BoundedPool, Pool, PoolConfiguration, PoolError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    println!("=== bounded_pool - Basic Examples ===\n");

    // Example 1: Get and put
    get_and_put();

    // Example 2: Overflow in both directions
    overflow();

    // Example 3: Guards
    guards();

    // Example 4: Release
    release();
}

fn counting_config() -> (PoolConfiguration<usize>, Arc<AtomicUsize>) {
    let next = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&next);
    let config = PoolConfiguration::new(
        move || Ok(counter.fetch_add(1, Ordering::SeqCst)),
        |id: usize| {
            println!("   closing resource {}", id);
            Ok(())
        },
    );
    (config, next)
}

fn get_and_put() {
    println!("1. Get and Put:");
    let (config, _) = counting_config();
    let pool = BoundedPool::new(config.with_init_cap(2).with_max_cap(4)).unwrap();

    let conn = pool.get().unwrap();
    println!("   Got resource {}, idle now {}", conn, pool.len());

    pool.put(conn).unwrap();
    println!("   Idle after put: {}\n", pool.len());
}

fn overflow() {
    println!("2. Overflow:");
    let (config, built) = counting_config();
    let pool = BoundedPool::new(config.with_init_cap(2).with_max_cap(2)).unwrap();

    let a = pool.get().unwrap();
    let b = pool.get().unwrap();
    let c = pool.get().unwrap();
    println!("   Three gets from a pool of two built {} resources", built.load(Ordering::SeqCst));

    for conn in [a, b, c] {
        pool.put(conn).unwrap();
    }
    println!("   Idle after returning all three: {}\n", pool.len());
}

fn guards() {
    println!("3. Guards:");
    let (config, _) = counting_config();
    let pool = BoundedPool::new(config).unwrap();

    {
        let conn = pool.acquire().unwrap();
        println!("   Guard holds resource {}", *conn);
    }
    println!("   Idle after guard dropped: {}", pool.len());

    let conn = pool.acquire().unwrap();
    conn.discard().unwrap();
    println!("   Idle after discard: {}\n", pool.len());
}

fn release() {
    println!("4. Release:");
    let (config, _) = counting_config();
    let pool = BoundedPool::new(config.with_init_cap(3).with_max_cap(3)).unwrap();

    let held = pool.get().unwrap();
    pool.release();

    match pool.get() {
        Err(PoolError::Closed) => println!("   Get after release: pool is closed"),
        other => println!("   Unexpected: {:?}", other),
    }

    pool.put(held).unwrap();
    println!("   Idle after put on a released pool: {}", pool.len());
}
