//! Health snapshot for pools

/// Health status of a pool
///
/// Built from the pool's own bookkeeping; the configured health-check hook is
/// never invoked to produce it.
///
/// # Examples
///
/// ```
/// use bounded_pool::{BoundedPool, Pool, PoolConfiguration};
///
/// let pool = BoundedPool::new(
///     PoolConfiguration::with_drop_close(|| Ok(1u32)).with_init_cap(3).with_max_cap(4),
/// ).unwrap();
///
/// let health = pool.health_status();
/// assert!(health.is_healthy());
/// assert_eq!(health.idle_resources, 3);
///
/// pool.release();
/// assert!(!pool.health_status().is_healthy());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HealthStatus {
    /// Whether the pool is healthy
    pub is_healthy: bool,

    /// Whether the pool has been released
    pub is_closed: bool,

    /// Idle resources relative to capacity (0.0 to 1.0)
    pub fill_ratio: f64,

    /// Idle resources count
    pub idle_resources: usize,

    /// Idle capacity
    pub max_capacity: usize,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl HealthStatus {
    /// Create a new health status
    pub fn new(idle: usize, capacity: usize, is_closed: bool) -> Self {
        let fill_ratio = if capacity > 0 {
            idle as f64 / capacity as f64
        } else {
            0.0
        };

        let mut warnings = Vec::new();
        let mut is_healthy = true;

        if is_closed {
            warnings.push("Pool is closed".to_string());
            is_healthy = false;
        } else if idle == 0 {
            // Gets will fall through to the factory until something is returned
            warnings.push("No idle resources".to_string());
        }

        Self {
            is_healthy,
            is_closed,
            fill_ratio,
            idle_resources: idle,
            max_capacity: capacity,
            warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}
