//! # bounded_pool
//!
//! Bounded, thread-safe resource pool for things that are expensive to build,
//! such as network connections.
//!
//! ## Features
//!
//! - A small [`Pool`] contract: `get`, `put`, `close`, `release`, `len`
//! - [`BoundedPool`] with a lock-free idle queue capped at `max_cap`
//! - Gets never wait: an empty pool builds a fresh resource on demand
//! - Puts never wait: a full pool destroys the surplus resource
//! - Idle-timeout eviction, checked whenever a resource is taken
//! - Safe shutdown while gets and puts are in flight
//! - RAII guard that returns resources on drop
//! - Async adapter that runs factory and close calls on blocking threads
//! - Metrics, Prometheus export and health snapshots
//!
//! ## Quick Start
//!
//! ```rust
//! use bounded_pool::{BoundedPool, Pool, PoolConfiguration};
//! use std::time::Duration;
//!
//! let config = PoolConfiguration::new(
//!     || Ok(String::from("connection")),
//!     |conn: String| {
//!         println!("closing {conn}");
//!         Ok(())
//!     },
//! )
//! .with_init_cap(2)
//! .with_max_cap(8)
//! .with_idle_timeout(Duration::from_secs(60));
//!
//! let pool = BoundedPool::new(config).unwrap();
//! {
//!     let conn = pool.acquire().unwrap();
//!     println!("Got: {}", *conn);
//!     // Resource automatically returned when `conn` goes out of scope
//! }
//! assert_eq!(pool.len(), 2);
//!
//! pool.release();
//! assert!(pool.get().is_err());
//! ```

mod pool;
mod async_pool;
mod config;
mod metrics;
mod health;
mod eviction;
mod errors;

pub use pool::{Pool, BoundedPool, PooledResource};
pub use async_pool::AsyncPool;
pub use config::{PoolConfiguration, FactoryFn, CloseFn, AliveFn};
pub use metrics::{PoolMetrics, MetricsExporter};
#[cfg(feature = "prometheus")]
pub use metrics::RegisteredMetrics;
pub use health::HealthStatus;
pub use eviction::EvictionPolicy;
pub use errors::{BoxError, PoolError, PoolResult};
