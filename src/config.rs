//! Pool configuration options

use crate::errors::{BoxError, PoolError, PoolResult};
use crate::eviction::EvictionPolicy;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Constructs a fresh resource
pub type FactoryFn<T> = dyn Fn() -> Result<T, BoxError> + Send + Sync;

/// Destroys a resource the pool no longer wants
pub type CloseFn<T> = dyn Fn(T) -> Result<(), BoxError> + Send + Sync;

/// Health-check hook, stored for callers but never invoked by the pool
pub type AliveFn = dyn Fn() -> Result<(), BoxError> + Send + Sync;

/// Configuration for pool behavior
///
/// # Examples
///
/// ```
/// use bounded_pool::PoolConfiguration;
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new(|| Ok(String::from("conn")), |_conn: String| Ok(()))
///     .with_init_cap(2)
///     .with_max_cap(8)
///     .with_idle_timeout(Duration::from_secs(30));
///
/// assert_eq!(config.init_cap, 2);
/// assert_eq!(config.max_cap, 8);
/// assert!(config.validate().is_ok());
/// ```
pub struct PoolConfiguration<T> {
    /// Number of resources constructed eagerly by `BoundedPool::new`
    pub init_cap: usize,

    /// Maximum number of idle resources retained by the pool
    pub max_cap: usize,

    /// Construct behavior
    pub factory: Arc<FactoryFn<T>>,

    /// Destroy behavior
    pub close: Arc<CloseFn<T>>,

    /// Reserved health-check hook
    pub alive: Option<Arc<AliveFn>>,

    /// How long a resource may sit idle before it is destroyed; zero disables expiry
    pub idle_timeout: Duration,
}

impl<T> PoolConfiguration<T> {
    /// Create a configuration from the construct and destroy behaviors
    pub fn new<F, C>(factory: F, close: C) -> Self
    where
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
        C: Fn(T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            init_cap: 1,
            max_cap: 10,
            factory: Arc::new(factory),
            close: Arc::new(close),
            alive: None,
            idle_timeout: Duration::ZERO,
        }
    }

    /// Create a configuration whose destroy behavior just drops the resource
    ///
    /// # Examples
    ///
    /// ```
    /// use bounded_pool::PoolConfiguration;
    ///
    /// let config = PoolConfiguration::with_drop_close(|| Ok(vec![0u8; 1024]));
    /// assert!((config.close)(vec![1, 2, 3]).is_ok());
    /// ```
    pub fn with_drop_close<F>(factory: F) -> Self
    where
        T: 'static,
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::new(factory, |resource: T| {
            drop(resource);
            Ok(())
        })
    }

    /// Set the initial population
    pub fn with_init_cap(mut self, init_cap: usize) -> Self {
        self.init_cap = init_cap;
        self
    }

    /// Set the idle capacity
    pub fn with_max_cap(mut self, max_cap: usize) -> Self {
        self.max_cap = max_cap;
        self
    }

    /// Set the idle timeout
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Attach a health-check hook
    pub fn with_health_check<A>(mut self, alive: A) -> Self
    where
        A: Fn() -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.alive = Some(Arc::new(alive));
        self
    }

    /// Check the capacity bounds
    ///
    /// # Examples
    ///
    /// ```
    /// use bounded_pool::{PoolConfiguration, PoolError};
    ///
    /// let config = PoolConfiguration::with_drop_close(|| Ok(0u32))
    ///     .with_init_cap(5)
    ///     .with_max_cap(2);
    ///
    /// assert!(matches!(config.validate(), Err(PoolError::InvalidConfig(_))));
    /// ```
    pub fn validate(&self) -> PoolResult<()> {
        if self.init_cap == 0 {
            return Err(PoolError::InvalidConfig(
                "init_cap must be greater than 0".to_string(),
            ));
        }
        if self.max_cap == 0 {
            return Err(PoolError::InvalidConfig(
                "max_cap must be greater than 0".to_string(),
            ));
        }
        if self.init_cap > self.max_cap {
            return Err(PoolError::InvalidConfig(format!(
                "init_cap ({}) must not exceed max_cap ({})",
                self.init_cap, self.max_cap
            )));
        }
        Ok(())
    }

    /// Eviction policy derived from the idle timeout
    pub fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy::from_idle_timeout(self.idle_timeout)
    }
}

impl<T> Clone for PoolConfiguration<T> {
    fn clone(&self) -> Self {
        Self {
            init_cap: self.init_cap,
            max_cap: self.max_cap,
            factory: Arc::clone(&self.factory),
            close: Arc::clone(&self.close),
            alive: self.alive.clone(),
            idle_timeout: self.idle_timeout,
        }
    }
}

impl<T> fmt::Debug for PoolConfiguration<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfiguration")
            .field("init_cap", &self.init_cap)
            .field("max_cap", &self.max_cap)
            .field("has_health_check", &self.alive.is_some())
            .field("idle_timeout", &self.idle_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PoolConfiguration<u32> {
        PoolConfiguration::with_drop_close(|| Ok(7))
    }

    #[test]
    fn test_defaults() {
        let config = config();

        assert_eq!(config.init_cap, 1);
        assert_eq!(config.max_cap, 10);
        assert_eq!(config.idle_timeout, Duration::ZERO);
        assert!(config.alive.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_caps() {
        assert!(matches!(
            config().with_init_cap(0).validate(),
            Err(PoolError::InvalidConfig(_))
        ));
        assert!(matches!(
            config().with_max_cap(0).validate(),
            Err(PoolError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_init_above_max() {
        let err = config().with_init_cap(4).with_max_cap(3).validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid pool configuration: init_cap (4) must not exceed max_cap (3)"
        );
    }

    #[test]
    fn test_init_equal_to_max_is_valid() {
        assert!(config().with_init_cap(3).with_max_cap(3).validate().is_ok());
    }

    #[test]
    fn test_eviction_policy_follows_idle_timeout() {
        assert!(matches!(config().eviction_policy(), EvictionPolicy::None));
        assert!(matches!(
            config()
                .with_idle_timeout(Duration::from_secs(5))
                .eviction_policy(),
            EvictionPolicy::IdleTimeout(d) if d == Duration::from_secs(5)
        ));
    }

    #[test]
    fn test_health_check_is_stored() {
        let config = config().with_health_check(|| Ok(()));
        let alive = config.alive.as_ref().unwrap();
        assert!(alive().is_ok());
        assert!(format!("{:?}", config).contains("has_health_check: true"));
    }
}
