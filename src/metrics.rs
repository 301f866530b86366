//! Metrics collection and export for pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Metrics snapshot for a pool
///
/// # Examples
///
/// ```
/// use bounded_pool::{BoundedPool, Pool, PoolConfiguration};
///
/// let pool = BoundedPool::new(PoolConfiguration::with_drop_close(|| Ok(1u32)).with_init_cap(2)).unwrap();
///
/// let conn = pool.get().unwrap();
/// pool.put(conn).unwrap();
///
/// let metrics = pool.metrics();
/// assert_eq!(metrics.created, 2);
/// assert_eq!(metrics.reused, 1);
/// assert_eq!(metrics.returned, 1);
/// assert_eq!(metrics.idle_resources, 2);
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Resources built by the factory
    pub created: usize,

    /// Gets served from the idle queue
    pub reused: usize,

    /// Puts that landed in the idle queue
    pub returned: usize,

    /// Resources passed to the destroy behavior
    pub destroyed: usize,

    /// Idle resources destroyed because they outlived the idle timeout
    pub expired: usize,

    /// Puts shed because the idle queue was full
    pub overflowed: usize,

    /// Factory calls that returned an error
    pub factory_failures: usize,

    /// Destroy calls that returned an error
    pub destroy_failures: usize,

    /// Current idle resources
    pub idle_resources: usize,

    /// Idle capacity
    pub max_capacity: usize,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("created".to_string(), self.created.to_string());
        metrics.insert("reused".to_string(), self.reused.to_string());
        metrics.insert("returned".to_string(), self.returned.to_string());
        metrics.insert("destroyed".to_string(), self.destroyed.to_string());
        metrics.insert("expired".to_string(), self.expired.to_string());
        metrics.insert("overflowed".to_string(), self.overflowed.to_string());
        metrics.insert("factory_failures".to_string(), self.factory_failures.to_string());
        metrics.insert("destroy_failures".to_string(), self.destroy_failures.to_string());
        metrics.insert("idle_resources".to_string(), self.idle_resources.to_string());
        metrics.insert("max_capacity".to_string(), self.max_capacity.to_string());
        metrics
    }
}

/// Metrics exporter for Prometheus
pub struct MetricsExporter;

impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use bounded_pool::{BoundedPool, PoolConfiguration};
    /// use std::collections::HashMap;
    ///
    /// let pool = BoundedPool::new(PoolConfiguration::with_drop_close(|| Ok(1u32))).unwrap();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = pool.export_metrics_prometheus("db", Some(&tags));
    /// assert!(output.contains("pool_resources_idle{pool=\"db\",service=\"api\"} 1"));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let mut output = String::new();
        let labels = Self::format_labels(pool_name, tags);

        // Gauge metrics
        output.push_str("# HELP pool_resources_idle Current idle resources\n");
        output.push_str("# TYPE pool_resources_idle gauge\n");
        output.push_str(&format!("pool_resources_idle{{{}}} {}\n", labels, metrics.idle_resources));

        output.push_str("# HELP pool_resources_capacity Idle capacity\n");
        output.push_str("# TYPE pool_resources_capacity gauge\n");
        output.push_str(&format!("pool_resources_capacity{{{}}} {}\n", labels, metrics.max_capacity));

        // Counter metrics
        for (name, help, value) in Self::counters(metrics) {
            output.push_str(&format!("# HELP {} {}\n", name, help));
            output.push_str(&format!("# TYPE {} counter\n", name));
            output.push_str(&format!("{}{{{}}} {}\n", name, labels, value));
        }

        output
    }

    /// Register the pool's metrics in a Prometheus registry
    ///
    /// Call this once per registry. The returned handle owns the registered
    /// collectors; call [`RegisteredMetrics::update`] with a fresh snapshot
    /// before each scrape.
    ///
    /// # Examples
    ///
    /// ```
    /// use bounded_pool::{BoundedPool, MetricsExporter, Pool, PoolConfiguration};
    ///
    /// let pool = BoundedPool::new(PoolConfiguration::with_drop_close(|| Ok(1u32))).unwrap();
    /// let registry = prometheus::Registry::new();
    ///
    /// let registered = MetricsExporter::register(&pool.metrics(), "db", &registry).unwrap();
    /// let conn = pool.get().unwrap();
    /// registered.update(&pool.metrics());
    /// assert_eq!(registered.idle(), 0);
    /// # pool.put(conn).unwrap();
    /// ```
    #[cfg(feature = "prometheus")]
    pub fn register(
        metrics: &PoolMetrics,
        pool_name: &str,
        registry: &prometheus::Registry,
    ) -> prometheus::Result<RegisteredMetrics> {
        let gauge = |name: &str, help: &str| {
            prometheus::IntGauge::with_opts(
                prometheus::Opts::new(name, help).const_label("pool", pool_name),
            )
        };

        let idle = gauge("pool_resources_idle", "Current idle resources")?;
        let capacity = gauge("pool_resources_capacity", "Idle capacity")?;
        registry.register(Box::new(idle.clone()))?;
        registry.register(Box::new(capacity.clone()))?;

        let mut counters = Vec::new();
        for (name, help, _) in Self::counters(metrics) {
            let opts = prometheus::Opts::new(name, help).const_label("pool", pool_name);
            let counter = prometheus::IntCounter::with_opts(opts)?;
            registry.register(Box::new(counter.clone()))?;
            counters.push(counter);
        }

        let registered = RegisteredMetrics {
            idle,
            capacity,
            counters,
        };
        registered.update(metrics);
        Ok(registered)
    }

    fn counters(metrics: &PoolMetrics) -> Vec<(&'static str, &'static str, usize)> {
        vec![
            ("pool_resources_created_total", "Resources built by the factory", metrics.created),
            ("pool_resources_reused_total", "Gets served from the idle queue", metrics.reused),
            ("pool_resources_returned_total", "Puts kept as idle resources", metrics.returned),
            ("pool_resources_destroyed_total", "Resources destroyed", metrics.destroyed),
            ("pool_resources_expired_total", "Idle resources evicted by timeout", metrics.expired),
            ("pool_resources_overflowed_total", "Puts shed because the pool was full", metrics.overflowed),
            ("pool_factory_failures_total", "Factory errors", metrics.factory_failures),
            ("pool_destroy_failures_total", "Destroy errors", metrics.destroy_failures),
        ]
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", escape_label_value(pool_name))];

        if let Some(tags) = tags {
            let mut tags: Vec<_> = tags.iter().collect();
            tags.sort();
            for (key, value) in tags {
                labels.push(format!("{}=\"{}\"", key, escape_label_value(value)));
            }
        }

        labels.join(",")
    }
}

/// Backslash, double quote and newline must be escaped inside label values
fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Collectors registered by [`MetricsExporter::register`]
#[cfg(feature = "prometheus")]
pub struct RegisteredMetrics {
    idle: prometheus::IntGauge,
    capacity: prometheus::IntGauge,
    // Same order as `MetricsExporter::counters`
    counters: Vec<prometheus::IntCounter>,
}

#[cfg(feature = "prometheus")]
impl RegisteredMetrics {
    /// Bring the registered collectors in line with a snapshot
    pub fn update(&self, metrics: &PoolMetrics) {
        self.idle.set(metrics.idle_resources as i64);
        self.capacity.set(metrics.max_capacity as i64);

        for (counter, (_, _, value)) in self.counters.iter().zip(MetricsExporter::counters(metrics)) {
            // Pool counters only grow, so the difference is never negative
            counter.inc_by((value as u64).saturating_sub(counter.get()));
        }
    }

    /// Current value of the idle gauge
    pub fn idle(&self) -> i64 {
        self.idle.get()
    }
}

/// Internal metrics tracker
#[derive(Default)]
pub(crate) struct MetricsTracker {
    pub created: AtomicUsize,
    pub reused: AtomicUsize,
    pub returned: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub expired: AtomicUsize,
    pub overflowed: AtomicUsize,
    pub factory_failures: AtomicUsize,
    pub destroy_failures: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self, idle: usize, capacity: usize) -> PoolMetrics {
        PoolMetrics {
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            returned: self.returned.load(Ordering::Relaxed),
            destroyed: self.destroyed.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            overflowed: self.overflowed.load(Ordering::Relaxed),
            factory_failures: self.factory_failures.load(Ordering::Relaxed),
            destroy_failures: self.destroy_failures.load(Ordering::Relaxed),
            idle_resources: idle,
            max_capacity: capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_snapshot() {
        let tracker = MetricsTracker::new();
        MetricsTracker::increment(&tracker.created);
        MetricsTracker::increment(&tracker.created);
        MetricsTracker::increment(&tracker.overflowed);

        let metrics = tracker.get_metrics(1, 4);
        assert_eq!(metrics.created, 2);
        assert_eq!(metrics.overflowed, 1);
        assert_eq!(metrics.reused, 0);
        assert_eq!(metrics.idle_resources, 1);
        assert_eq!(metrics.max_capacity, 4);
    }

    #[test]
    fn test_export_map() {
        let metrics = PoolMetrics {
            expired: 3,
            ..Default::default()
        };
        let exported = metrics.export();
        assert_eq!(exported.get("expired").map(String::as_str), Some("3"));
        assert_eq!(exported.len(), 10);
    }

    #[test]
    fn test_prometheus_labels_are_sorted() {
        let mut tags = HashMap::new();
        tags.insert("zone".to_string(), "b".to_string());
        tags.insert("app".to_string(), "x".to_string());

        let output = MetricsExporter::export_prometheus(&PoolMetrics::default(), "p", Some(&tags));
        assert!(output.contains("pool_resources_created_total{pool=\"p\",app=\"x\",zone=\"b\"} 0"));
        assert!(output.contains("# TYPE pool_destroy_failures_total counter"));
    }

    #[test]
    fn test_label_values_are_escaped() {
        let mut tags = HashMap::new();
        tags.insert("path".to_string(), "C:\\data\n\"primary\"".to_string());

        let output = MetricsExporter::export_prometheus(&PoolMetrics::default(), "a\"b", Some(&tags));
        assert!(output.contains(
            "pool_resources_idle{pool=\"a\\\"b\",path=\"C:\\\\data\\n\\\"primary\\\"\"} 0"
        ));
        assert_eq!(
            output.lines().filter(|line| line.starts_with("pool_resources_idle")).count(),
            1
        );
    }

    #[cfg(feature = "prometheus")]
    mod registry {
        use super::*;
        use crate::config::PoolConfiguration;
        use crate::pool::{BoundedPool, Pool};
        use prometheus::proto::MetricType;

        fn family<'a>(
            families: &'a [prometheus::proto::MetricFamily],
            name: &str,
        ) -> &'a prometheus::proto::MetricFamily {
            families.iter().find(|family| family.get_name() == name).unwrap()
        }

        #[test]
        fn test_registered_metrics_follow_pool_state() {
            let pool = BoundedPool::new(
                PoolConfiguration::with_drop_close(|| Ok(1u32))
                    .with_init_cap(2)
                    .with_max_cap(2),
            )
            .unwrap();
            let registry = prometheus::Registry::new();
            let registered = MetricsExporter::register(&pool.metrics(), "db", &registry).unwrap();

            let families = registry.gather();
            let created = family(&families, "pool_resources_created_total");
            assert_eq!(created.get_field_type(), MetricType::COUNTER);
            assert_eq!(created.get_metric()[0].get_counter().get_value(), 2.0);
            let idle = family(&families, "pool_resources_idle");
            assert_eq!(idle.get_field_type(), MetricType::GAUGE);
            assert_eq!(idle.get_metric()[0].get_gauge().get_value(), 2.0);

            let held: Vec<_> = (0..3).map(|_| pool.get().unwrap()).collect();
            registered.update(&pool.metrics());
            registered.update(&pool.metrics());

            let families = registry.gather();
            assert_eq!(
                family(&families, "pool_resources_created_total").get_metric()[0]
                    .get_counter()
                    .get_value(),
                3.0
            );
            assert_eq!(
                family(&families, "pool_resources_idle").get_metric()[0]
                    .get_gauge()
                    .get_value(),
                0.0
            );
            assert_eq!(registered.idle(), 0);

            for conn in held {
                pool.put(conn).unwrap();
            }
        }

        #[test]
        fn test_every_total_is_a_counter() {
            let registry = prometheus::Registry::new();
            MetricsExporter::register(&PoolMetrics::default(), "db", &registry).unwrap();

            for family in registry.gather() {
                let expected = if family.get_name().ends_with("_total") {
                    MetricType::COUNTER
                } else {
                    MetricType::GAUGE
                };
                assert_eq!(family.get_field_type(), expected, "{}", family.get_name());
            }
        }

        #[test]
        fn test_second_registration_on_same_registry_fails() {
            let registry = prometheus::Registry::new();
            MetricsExporter::register(&PoolMetrics::default(), "db", &registry).unwrap();
            assert!(MetricsExporter::register(&PoolMetrics::default(), "db", &registry).is_err());
        }
    }
}
