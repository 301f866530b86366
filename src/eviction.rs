//! Idle-timeout eviction

use std::time::{Duration, Instant};

/// Eviction policy for idle resources
///
/// # Examples
///
/// ```
/// use bounded_pool::EvictionPolicy;
/// use std::time::Duration;
///
/// assert_eq!(EvictionPolicy::from_idle_timeout(Duration::ZERO), EvictionPolicy::None);
/// assert_eq!(
///     EvictionPolicy::from_idle_timeout(Duration::from_secs(30)),
///     EvictionPolicy::IdleTimeout(Duration::from_secs(30)),
/// );
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Idle resources never expire
    #[default]
    None,

    /// Idle resources expire after sitting unused for longer than the duration
    IdleTimeout(Duration),
}

impl EvictionPolicy {
    /// Map an idle timeout to a policy; zero disables eviction
    pub fn from_idle_timeout(timeout: Duration) -> Self {
        if timeout.is_zero() {
            EvictionPolicy::None
        } else {
            EvictionPolicy::IdleTimeout(timeout)
        }
    }

    /// Whether something idle since `idle_since` has expired as of `now`
    pub fn is_expired_at(&self, idle_since: Instant, now: Instant) -> bool {
        match self {
            EvictionPolicy::None => false,
            EvictionPolicy::IdleTimeout(timeout) => {
                now.saturating_duration_since(idle_since) > *timeout
            }
        }
    }
}

/// A pool-owned resource and the moment it became idle
#[derive(Debug)]
pub(crate) struct IdleEntry<T> {
    resource: T,
    idle_since: Instant,
}

impl<T> IdleEntry<T> {
    pub fn new(resource: T) -> Self {
        Self {
            resource,
            idle_since: Instant::now(),
        }
    }

    pub fn is_expired(&self, policy: &EvictionPolicy) -> bool {
        policy.is_expired_at(self.idle_since, Instant::now())
    }

    pub fn into_resource(self) -> T {
        self.resource
    }
}
