//! Async adapter that keeps slow factory and close calls off the runtime threads

use crate::errors::{PoolError, PoolResult};
use crate::pool::{BoundedPool, Pool};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Async access to a shared pool
///
/// Every call runs the synchronous operation on tokio's blocking thread pool,
/// since it may construct or destroy resources. A blocking task that panics or
/// is cancelled surfaces as [`PoolError::Cancelled`]. Dropping a pending
/// `get_async` does not stop the blocking work; whatever it obtains is put back
/// into the pool.
///
/// # Examples
///
/// ```
/// use bounded_pool::{AsyncPool, BoundedPool, PoolConfiguration};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let pool = Arc::new(BoundedPool::new(PoolConfiguration::with_drop_close(|| Ok(5u32))).unwrap());
///
/// let conn = pool.get_async().await.unwrap();
/// pool.put_async(conn).await.unwrap();
/// pool.release_async().await.unwrap();
/// # }
/// ```
#[async_trait]
pub trait AsyncPool<T> {
    async fn get_async(&self) -> PoolResult<T>;

    async fn put_async(&self, resource: T) -> PoolResult<()>;

    async fn close_async(&self, resource: T) -> PoolResult<()>;

    async fn release_async(&self) -> PoolResult<()>;
}

#[async_trait]
impl<T: Send + 'static> AsyncPool<T> for Arc<BoundedPool<T>> {
    async fn get_async(&self) -> PoolResult<T> {
        let pool = Arc::clone(self);
        let checkout = tokio::task::spawn_blocking(move || {
            let resource = pool.get()?;
            Ok::<_, PoolError>(Checkout::new(resource, pool))
        })
        .await
        .map_err(|_| PoolError::Cancelled)??;

        checkout.into_inner().ok_or(PoolError::Cancelled)
    }

    async fn put_async(&self, resource: T) -> PoolResult<()> {
        let pool = Arc::clone(self);
        tokio::task::spawn_blocking(move || pool.put(resource))
            .await
            .map_err(|_| PoolError::Cancelled)?
    }

    async fn close_async(&self, resource: T) -> PoolResult<()> {
        let pool = Arc::clone(self);
        tokio::task::spawn_blocking(move || pool.close(resource))
            .await
            .map_err(|_| PoolError::Cancelled)?
    }

    async fn release_async(&self) -> PoolResult<()> {
        let pool = Arc::clone(self);
        tokio::task::spawn_blocking(move || pool.release())
            .await
            .map_err(|_| PoolError::Cancelled)
    }
}

/// Resource in transit from a blocking task; put back if nobody claims it
struct Checkout<T> {
    resource: Option<T>,
    pool: Arc<BoundedPool<T>>,
}

impl<T> Checkout<T> {
    fn new(resource: T, pool: Arc<BoundedPool<T>>) -> Self {
        Self {
            resource: Some(resource),
            pool,
        }
    }

    fn into_inner(mut self) -> Option<T> {
        self.resource.take()
    }
}

impl<T> Drop for Checkout<T> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take()
            && let Err(err) = self.pool.put(resource)
        {
            warn!(error = %err, "failed to return resource from cancelled get");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfiguration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn slow_pool(closed: &Arc<AtomicUsize>) -> Arc<BoundedPool<u64>> {
        pool_with_dial_time(closed, Duration::from_millis(5))
    }

    fn pool_with_dial_time(closed: &Arc<AtomicUsize>, dial: Duration) -> Arc<BoundedPool<u64>> {
        let next = Arc::new(AtomicUsize::new(0));
        let on_close = Arc::clone(closed);
        let config = PoolConfiguration::new(
            move || {
                std::thread::sleep(dial);
                Ok(next.fetch_add(1, Ordering::SeqCst) as u64)
            },
            move |_conn: u64| {
                std::thread::sleep(Duration::from_millis(5));
                on_close.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .with_init_cap(2)
        .with_max_cap(2);

        Arc::new(BoundedPool::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_async_round_trip() {
        let closed = Arc::new(AtomicUsize::new(0));
        let pool = slow_pool(&closed);

        let conn = pool.get_async().await.unwrap();
        assert_eq!(pool.len(), 1);

        pool.put_async(conn).await.unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_async_close_and_release() {
        let closed = Arc::new(AtomicUsize::new(0));
        let pool = slow_pool(&closed);

        let conn = pool.get_async().await.unwrap();
        pool.close_async(conn).await.unwrap();
        assert_eq!(closed.load(Ordering::SeqCst), 1);

        pool.release_async().await.unwrap();
        assert_eq!(closed.load(Ordering::SeqCst), 2);
        assert!(matches!(pool.get_async().await, Err(PoolError::Closed)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_tasks_share_pool() {
        let closed = Arc::new(AtomicUsize::new(0));
        let pool = slow_pool(&closed);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let pool = Arc::clone(&pool);
            handles.push(tokio::spawn(async move {
                let conn = pool.get_async().await?;
                pool.put_async(conn).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(pool.len(), 2);
        let metrics = pool.metrics();
        assert_eq!(metrics.created - metrics.destroyed, 2);
    }

    #[tokio::test]
    async fn test_dropped_get_puts_resource_back() {
        let closed = Arc::new(AtomicUsize::new(0));
        let pool = pool_with_dial_time(&closed, Duration::from_millis(100));

        // Empty the idle queue so the next get has to dial
        let first = pool.get().unwrap();
        let second = pool.get().unwrap();

        let pending = tokio::time::timeout(Duration::from_millis(10), pool.get_async()).await;
        assert!(pending.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;

        let metrics = pool.metrics();
        assert_eq!(metrics.created, 3);
        assert_eq!(pool.len(), 1);
        assert_eq!(metrics.created, closed.load(Ordering::SeqCst) + pool.len() + 2);

        pool.put(first).unwrap();
        pool.put(second).unwrap();
        pool.release();
        assert_eq!(closed.load(Ordering::SeqCst), 3);
    }
}
