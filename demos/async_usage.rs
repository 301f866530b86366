//! Async usage examples

use bounded_pool::{AsyncPool, BoundedPool, Pool, PoolConfiguration};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct Session {
    id: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== bounded_pool - Async Examples ===\n");

    let next = Arc::new(AtomicUsize::new(0));
    let config = PoolConfiguration::new(
        move || {
            // Pretend to dial a server
            std::thread::sleep(Duration::from_millis(20));
            Ok(Session {
                id: next.fetch_add(1, Ordering::SeqCst),
            })
        },
        |session: Session| {
            std::thread::sleep(Duration::from_millis(5));
            println!("   closed session {}", session.id);
            Ok(())
        },
    )
    .with_init_cap(2)
    .with_max_cap(4);

    let pool = Arc::new(BoundedPool::new(config).unwrap());

    // Example 1: Async get
    async_get(&pool).await;

    // Example 2: Concurrent access
    concurrent_access(&pool).await;

    // Example 3: Release without blocking the runtime
    println!("3. Async Release:");
    pool.release_async().await.unwrap();
    println!("   Closed: {}", pool.is_closed());
}

async fn async_get(pool: &Arc<BoundedPool<Session>>) {
    println!("1. Async Get:");
    let session = pool.get_async().await.unwrap();
    println!("   Got session {} asynchronously", session.id);
    pool.put_async(session).await.unwrap();
    println!();
}

async fn concurrent_access(pool: &Arc<BoundedPool<Session>>) {
    println!("2. Concurrent Access:");

    let mut handles = vec![];
    for task in 0..8 {
        let pool = Arc::clone(pool);
        handles.push(tokio::spawn(async move {
            let session = pool.get_async().await.unwrap();
            println!("   Task {} using session {}", task, session.id);
            tokio::time::sleep(Duration::from_millis(10)).await;
            pool.put_async(session).await.unwrap();
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    println!("   Idle after all tasks: {}\n", pool.len());
}
