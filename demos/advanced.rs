//! Advanced features: idle eviction, health, metrics

use bounded_pool::{BoundedPool, MetricsExporter, Pool, PoolConfiguration};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug)]
struct Connection {
    id: usize,
    data: String,
}

impl Connection {
    fn new(id: usize) -> Self {
        Self {
            id,
            data: format!("Connection-{}", id),
        }
    }
}

fn connection_pool(idle_timeout: Duration) -> BoundedPool<Connection> {
    let next = Arc::new(AtomicUsize::new(1));
    let config = PoolConfiguration::new(
        move || Ok(Connection::new(next.fetch_add(1, Ordering::SeqCst))),
        |conn: Connection| {
            println!("   closing {}", conn.data);
            Ok(())
        },
    )
    .with_init_cap(3)
    .with_max_cap(5)
    .with_idle_timeout(idle_timeout)
    .with_health_check(|| Ok(()));

    BoundedPool::new(config).unwrap()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    println!("=== bounded_pool - Advanced Features ===\n");

    // Example 1: Idle eviction
    idle_eviction();

    // Example 2: Health check hook
    health();

    // Example 3: Prometheus metrics
    prometheus_export();
}

fn idle_eviction() {
    println!("1. Idle Eviction:");
    let pool = connection_pool(Duration::from_millis(200));
    println!("   Initial idle: {}", pool.len());

    thread::sleep(Duration::from_millis(300));

    // Every idle connection is stale now, so this closes all three and dials a fresh one
    let conn = pool.get().unwrap();
    println!("   Got connection {} after the idle timeout", conn.id);
    pool.put(conn).unwrap();

    let metrics = pool.metrics();
    println!("   Expired: {}, created: {}\n", metrics.expired, metrics.created);
}

fn health() {
    println!("2. Health:");
    let pool = connection_pool(Duration::ZERO);

    let status = pool.health_status();
    println!("   Healthy: {}, fill ratio {:.2}", status.is_healthy(), status.fill_ratio);

    // The pool never runs the check on its own; callers decide when to run the hook
    if let Some(alive) = pool.health_check() {
        println!("   Health check: {:?}", alive().map_err(|e| e.to_string()));
    }

    pool.release();
    let status = pool.health_status();
    println!("   After release: healthy {}, warnings {:?}\n", status.is_healthy(), status.warnings);
}

fn prometheus_export() {
    println!("3. Prometheus Export:");
    let pool = connection_pool(Duration::ZERO);

    let held: Vec<_> = (0..4).map(|_| pool.get().unwrap()).collect();
    for conn in held {
        pool.put(conn).unwrap();
    }

    let mut tags = HashMap::new();
    tags.insert("service".to_string(), "orders".to_string());

    let output = MetricsExporter::export_prometheus(&pool.metrics(), "orders_db", Some(&tags));
    for line in output.lines().filter(|line| !line.starts_with('#')) {
        println!("   {}", line);
    }
}
