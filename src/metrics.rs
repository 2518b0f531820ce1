//! Metrics collection and export for pools

use std::collections::HashMap;
use std::fmt::Write as _;

/// Point-in-time metrics for a pool
///
/// # Examples
///
/// ```
/// use resource_pool::{EagerPool, Pool};
///
/// let mut pool = EagerPool::from_fn(|| 1, 3).unwrap();
/// let item = pool.acquire().unwrap();
///
/// let metrics = pool.metrics();
/// assert_eq!(metrics.total_acquired, 1);
/// assert_eq!(metrics.in_use, 1);
///
/// pool.get_back(item);
/// assert_eq!(pool.metrics().total_returned, 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "metrics", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Total items handed out by `acquire`
    pub total_acquired: usize,

    /// Total items handed back through `get_back`
    pub total_returned: usize,

    /// Items created by the factory
    pub total_created: usize,

    /// Number of times `acquire` found nothing to hand out
    pub exhausted_events: usize,

    /// Number of factory calls that returned an error
    pub factory_failures: usize,

    /// Items currently on loan
    pub in_use: usize,

    /// Units still available to `acquire` (the pool's `count`)
    pub available: usize,

    /// Pool utilization ratio (0.0 to 1.0)
    pub utilization: f64,

    /// Maximum pool capacity
    pub capacity: usize,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_acquired".to_string(), self.total_acquired.to_string());
        metrics.insert("total_returned".to_string(), self.total_returned.to_string());
        metrics.insert("total_created".to_string(), self.total_created.to_string());
        metrics.insert("exhausted_events".to_string(), self.exhausted_events.to_string());
        metrics.insert("factory_failures".to_string(), self.factory_failures.to_string());
        metrics.insert("in_use".to_string(), self.in_use.to_string());
        metrics.insert("available".to_string(), self.available.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics.insert("capacity".to_string(), self.capacity.to_string());
        metrics
    }
}

/// Metrics exporter for Prometheus format
pub struct MetricsExporter;

impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use resource_pool::{EagerPool, MetricsExporter, Pool};
    /// use std::collections::HashMap;
    ///
    /// let pool = EagerPool::from_fn(|| 1, 3).unwrap();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = MetricsExporter::export_prometheus(&pool.metrics(), "db", Some(&tags));
    /// assert!(output.contains("pool_items_in_use"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let labels = Self::format_labels(pool_name, tags);
        let utilization = format!("{:.2}", metrics.utilization);

        let gauges = [
            ("pool_items_in_use", "Items currently on loan", metrics.in_use.to_string()),
            ("pool_items_available", "Items or slots available", metrics.available.to_string()),
            ("pool_utilization", "Pool utilization ratio", utilization),
        ];
        let counters = [
            ("pool_items_acquired_total", "Total items acquired", metrics.total_acquired),
            ("pool_items_returned_total", "Total items returned", metrics.total_returned),
            (
                "pool_items_created_total",
                "Total items created by the factory",
                metrics.total_created,
            ),
            (
                "pool_events_exhausted_total",
                "Acquire calls on an exhausted pool",
                metrics.exhausted_events,
            ),
            ("pool_factory_failures_total", "Factory calls that failed", metrics.factory_failures),
        ];
        let series = gauges
            .into_iter()
            .map(|(name, help, value)| (name, "gauge", help, value))
            .chain(
                counters
                    .into_iter()
                    .map(|(name, help, value)| (name, "counter", help, value.to_string())),
            );

        let mut output = String::new();
        for (name, kind, help, value) in series {
            let _ = writeln!(output, "# HELP {name} {help}");
            let _ = writeln!(output, "# TYPE {name} {kind}");
            let _ = writeln!(output, "{name}{{{labels}}} {value}");
        }
        output
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", pool_name)];

        if let Some(tags) = tags {
            let mut sorted: Vec<_> = tags.iter().collect();
            sorted.sort();
            for (key, value) in sorted {
                labels.push(format!("{}=\"{}\"", key, value));
            }
        }

        labels.join(",")
    }
}

/// Internal counters kept by every pool
#[derive(Debug, Default, Clone)]
pub(crate) struct MetricsTracker {
    acquired: usize,
    returned: usize,
    created: usize,
    exhausted: usize,
    factory_failures: usize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_acquired(&mut self) {
        self.acquired += 1;
    }

    pub fn record_returned(&mut self) {
        self.returned += 1;
    }

    pub fn record_created(&mut self) {
        self.created += 1;
    }

    pub fn record_exhausted(&mut self) {
        self.exhausted += 1;
    }

    pub fn record_factory_failure(&mut self) {
        self.factory_failures += 1;
    }

    pub fn snapshot(&self, available: usize, capacity: usize) -> PoolMetrics {
        let in_use = capacity.saturating_sub(available);
        let utilization = if capacity > 0 {
            in_use as f64 / capacity as f64
        } else {
            0.0
        };

        PoolMetrics {
            total_acquired: self.acquired,
            total_returned: self.returned,
            total_created: self.created,
            exhausted_events: self.exhausted,
            factory_failures: self.factory_failures,
            in_use,
            available,
            utilization,
            capacity,
        }
    }
}
