//! Pool contract and the bounded concurrent pool

use crate::config::{AliveFn, CloseFn, FactoryFn, PoolConfiguration};
use crate::errors::{BoxError, PoolError, PoolResult};
use crate::eviction::{EvictionPolicy, IdleEntry};
use crate::health::HealthStatus;
use crate::metrics::{MetricsExporter, MetricsTracker, PoolMetrics};

use crossbeam::queue::ArrayQueue;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Capability contract shared by pool implementations
///
/// `put` and `close` accept anything convertible into `Option<T>`, so a bare
/// resource or an `Option` both work; `None` is rejected with
/// [`PoolError::InvalidResource`].
pub trait Pool<T> {
    /// Take a ready-to-use resource, building one if nothing is idle
    fn get(&self) -> PoolResult<T>;

    /// Hand a resource back for reuse
    fn put<R: Into<Option<T>>>(&self, resource: R) -> PoolResult<()>;

    /// Destroy a single resource
    fn close<R: Into<Option<T>>>(&self, resource: R) -> PoolResult<()>;

    /// Shut the pool down and destroy every idle resource
    fn release(&self);

    /// Number of idle resources; advisory under concurrency
    fn len(&self) -> usize;

    /// Whether no resources are idle
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type IdleQueue<T> = ArrayQueue<IdleEntry<T>>;

enum PutOutcome<T> {
    Queued,
    Closed(T),
    Full(T),
}

/// Thread-safe pool with a bounded idle queue
///
/// Gets never wait: an empty queue means a fresh resource from the factory.
/// Puts never wait either: a full queue means the resource is destroyed.
///
/// # Examples
///
/// ```
/// use bounded_pool::{BoundedPool, Pool, PoolConfiguration};
///
/// let config = PoolConfiguration::with_drop_close(|| Ok(String::from("conn")))
///     .with_init_cap(2)
///     .with_max_cap(4);
/// let pool = BoundedPool::new(config).unwrap();
/// assert_eq!(pool.len(), 2);
///
/// let conn = pool.get().unwrap();
/// assert_eq!(pool.len(), 1);
///
/// pool.put(conn).unwrap();
/// assert_eq!(pool.len(), 2);
/// ```
pub struct BoundedPool<T> {
    // `None` once released; the queue itself synchronizes its contents
    idle: Mutex<Option<Arc<IdleQueue<T>>>>,
    factory: Arc<FactoryFn<T>>,
    destroy: Arc<CloseFn<T>>,
    alive: Option<Arc<AliveFn>>,
    eviction: EvictionPolicy,
    capacity: usize,
    metrics: MetricsTracker,
}

impl<T> BoundedPool<T> {
    /// Create a pool and eagerly build `init_cap` resources
    ///
    /// If any construction fails, everything built so far is destroyed and the
    /// factory error is returned.
    pub fn new(config: PoolConfiguration<T>) -> PoolResult<Self> {
        config.validate()?;

        let init_cap = config.init_cap;
        let pool = Self {
            idle: Mutex::new(Some(Arc::new(ArrayQueue::new(config.max_cap)))),
            eviction: config.eviction_policy(),
            capacity: config.max_cap,
            factory: config.factory,
            destroy: config.close,
            alive: config.alive,
            metrics: MetricsTracker::new(),
        };

        for _ in 0..init_cap {
            let resource = match pool.create() {
                Ok(resource) => resource,
                Err(err) => {
                    pool.release();
                    return Err(err);
                }
            };
            match pool.offer_idle(resource) {
                PutOutcome::Queued => {}
                PutOutcome::Closed(resource) | PutOutcome::Full(resource) => {
                    pool.destroy(resource)?;
                }
            }
        }

        debug!(init_cap, max_cap = pool.capacity, "pool created");
        Ok(pool)
    }

    /// Take a resource wrapped in a guard that puts it back on drop
    ///
    /// # Examples
    ///
    /// ```
    /// use bounded_pool::{BoundedPool, Pool, PoolConfiguration};
    ///
    /// let pool = BoundedPool::new(PoolConfiguration::with_drop_close(|| Ok(vec![0u8; 16]))).unwrap();
    /// {
    ///     let mut buf = pool.acquire().unwrap();
    ///     buf[0] = 1;
    ///     assert_eq!(pool.len(), 0);
    /// }
    /// assert_eq!(pool.len(), 1);
    /// ```
    pub fn acquire(&self) -> PoolResult<PooledResource<'_, T>> {
        let resource = self.get()?;
        Ok(PooledResource::new(resource, self))
    }

    /// Idle capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether `release` has run
    pub fn is_closed(&self) -> bool {
        self.idle.lock().is_none()
    }

    /// Eviction policy applied to idle resources
    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.eviction
    }

    /// The configured health-check hook
    ///
    /// The pool stores this for callers and never calls it itself.
    pub fn health_check(&self) -> Option<&AliveFn> {
        self.alive.as_deref()
    }

    /// Get health status
    pub fn health_status(&self) -> HealthStatus {
        match self.queue() {
            Some(queue) => HealthStatus::new(queue.len(), self.capacity, false),
            None => HealthStatus::new(0, self.capacity, true),
        }
    }

    /// Get pool metrics
    pub fn metrics(&self) -> PoolMetrics {
        self.metrics.get_metrics(self.idle_len(), self.capacity)
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.metrics().export()
    }

    /// Export metrics in Prometheus format
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        MetricsExporter::export_prometheus(&self.metrics(), pool_name, tags)
    }

    fn record_created(&self, result: Result<T, BoxError>) -> PoolResult<T> {
        match result {
            Ok(resource) => {
                MetricsTracker::increment(&self.metrics.created);
                Ok(resource)
            }
            Err(err) => {
                MetricsTracker::increment(&self.metrics.factory_failures);
                debug!(error = %err, "resource factory failed");
                Err(PoolError::Factory(err))
            }
        }
    }

    fn record_destroyed(&self, result: Result<(), BoxError>) -> PoolResult<()> {
        MetricsTracker::increment(&self.metrics.destroyed);
        result.map_err(|err| {
            MetricsTracker::increment(&self.metrics.destroy_failures);
            PoolError::Destroy(err)
        })
    }

    /// Pop one idle entry, skipping and destroying expired ones
    ///
    /// `Ok(None)` means the queue is empty and a new resource is needed.
    fn take_idle(&self) -> PoolResult<Option<T>> {
        loop {
            let queue = self.queue().ok_or(PoolError::Closed)?;

            let Some(entry) = queue.pop() else {
                return Ok(None);
            };

            if entry.is_expired(&self.eviction) {
                MetricsTracker::increment(&self.metrics.expired);
                debug!(idle = queue.len(), "evicting expired idle resource");
                if let Err(err) = self.destroy(entry.into_resource()) {
                    warn!(error = %err, "failed to close expired resource");
                }
                continue;
            }

            MetricsTracker::increment(&self.metrics.reused);
            return Ok(Some(entry.into_resource()));
        }
    }

    /// Enqueue under the shutdown mutex and report what was rejected
    fn offer_idle(&self, resource: T) -> PutOutcome<T> {
        let idle = self.idle.lock();
        match idle.as_ref() {
            None => PutOutcome::Closed(resource),
            Some(queue) => match queue.push(IdleEntry::new(resource)) {
                Ok(()) => PutOutcome::Queued,
                Err(entry) => PutOutcome::Full(entry.into_resource()),
            },
        }
    }

    fn create(&self) -> PoolResult<T> {
        self.record_created((self.factory)())
    }

    fn destroy(&self, resource: T) -> PoolResult<()> {
        self.record_destroyed((self.destroy)(resource))
    }

    fn put_idle(&self, resource: T) -> PoolResult<()> {
        match self.offer_idle(resource) {
            PutOutcome::Queued => {
                MetricsTracker::increment(&self.metrics.returned);
                Ok(())
            }
            PutOutcome::Closed(resource) => {
                debug!("pool is closed, closing returned resource");
                self.destroy(resource)
            }
            PutOutcome::Full(resource) => {
                MetricsTracker::increment(&self.metrics.overflowed);
                debug!(max_cap = self.capacity, "idle queue full, closing returned resource");
                self.destroy(resource)
            }
        }
    }

    /// Detach the queue so every later get/put sees a closed pool
    fn detach_queue(&self) -> Option<Arc<IdleQueue<T>>> {
        self.idle.lock().take()
    }

    fn drain(&self, queue: &IdleQueue<T>) -> usize {
        let mut destroyed = 0;
        while let Some(entry) = queue.pop() {
            if let Err(err) = self.destroy(entry.into_resource()) {
                warn!(error = %err, "failed to close idle resource during release");
            }
            destroyed += 1;
        }
        destroyed
    }

    fn queue(&self) -> Option<Arc<IdleQueue<T>>> {
        self.idle.lock().clone()
    }

    fn idle_len(&self) -> usize {
        self.queue().map_or(0, |queue| queue.len())
    }
}

impl<T> Pool<T> for BoundedPool<T> {
    fn get(&self) -> PoolResult<T> {
        match self.take_idle()? {
            Some(resource) => Ok(resource),
            None => self.create(),
        }
    }

    fn put<R: Into<Option<T>>>(&self, resource: R) -> PoolResult<()> {
        let resource = resource.into().ok_or(PoolError::InvalidResource)?;
        self.put_idle(resource)
    }

    fn close<R: Into<Option<T>>>(&self, resource: R) -> PoolResult<()> {
        let resource = resource.into().ok_or(PoolError::InvalidResource)?;
        self.destroy(resource)
    }

    fn release(&self) {
        let Some(queue) = self.detach_queue() else {
            return;
        };
        let destroyed = self.drain(&queue);
        info!(destroyed, "pool released");
    }

    fn len(&self) -> usize {
        self.idle_len()
    }
}

impl<T> Drop for BoundedPool<T> {
    fn drop(&mut self) {
        self.release();
    }
}

/// A pooled resource that goes back to the pool when dropped
pub struct PooledResource<'a, T> {
    resource: Option<T>,
    pool: &'a BoundedPool<T>,
}

impl<'a, T> PooledResource<'a, T> {
    fn new(resource: T, pool: &'a BoundedPool<T>) -> Self {
        Self {
            resource: Some(resource),
            pool,
        }
    }

    /// Take the resource out without returning it to the pool
    pub fn detach(mut self) -> T {
        self.resource.take().expect("Resource already taken")
    }

    /// Destroy the resource instead of returning it, e.g. after it broke
    pub fn discard(mut self) -> PoolResult<()> {
        match self.resource.take() {
            Some(resource) => self.pool.close(resource),
            None => Ok(()),
        }
    }
}

impl<T> Deref for PooledResource<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.resource.as_ref().expect("Resource already taken")
    }
}

impl<T> DerefMut for PooledResource<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.resource.as_mut().expect("Resource already taken")
    }
}

impl<T> Drop for PooledResource<'_, T> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take()
            && let Err(err) = self.pool.put(resource)
        {
            warn!(error = %err, "failed to return pooled resource");
        }
    }
}
