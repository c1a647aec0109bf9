//! Dispatch metrics collection
//!
//! Helpers around the `metrics` facade plus an in-memory aggregator for
//! end-of-run summaries.

use std::collections::HashMap;

use metrics::{counter, gauge, histogram};

/// Record packages accepted into a collection's buffer
pub fn record_packages_pushed(collection: &str, count: usize) {
    counter!(
        "shipper_packages_pushed_total",
        "collection" => collection.to_string()
    )
    .increment(count as u64);
}

/// Record one completed dispatch for a collection
pub fn record_shipment_dispatched(collection: &str, packages: usize) {
    counter!(
        "shipper_shipments_dispatched_total",
        "collection" => collection.to_string()
    )
    .increment(1);
    histogram!("shipper_shipment_size").record(packages as f64);
}

/// Record a shipment a subscriber could not ingest
pub fn record_shipment_failed(collection: &str, subscriber: &str) {
    counter!(
        "shipper_shipments_failed_total",
        "collection" => collection.to_string(),
        "subscriber" => subscriber.to_string()
    )
    .increment(1);
}

/// Record one retry attempt against the failure ledger
pub fn record_retry_attempt(subscriber: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "shipper_retries_total",
        "subscriber" => subscriber.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record the current depth of a collection's buffer
pub fn record_buffer_depth(collection: &str, depth: usize) {
    gauge!(
        "shipper_buffer_depth",
        "collection" => collection.to_string()
    )
    .set(depth as f64);
}

/// Dispatch statistics aggregator
///
/// Aggregates in memory for summaries, independent of the Prometheus
/// exporter.
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// Completed dispatches
    pub total_shipments: u64,

    /// Packages cleared across all dispatches
    pub total_packages: u64,

    /// Shipments archived after a subscriber failure
    pub total_failed: u64,

    /// Dispatch attempts denied by the throttle
    pub total_throttled: u64,

    /// Shipment size statistics
    pub size_stats: RunningStats,

    /// Per-collection package counts
    pub collection_counts: HashMap<String, u64>,
}

impl DispatchStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed dispatch
    pub fn record_dispatch(&mut self, collection: &str, packages: usize) {
        self.total_shipments += 1;
        self.total_packages += packages as u64;
        self.size_stats.push(packages as f64);
        *self
            .collection_counts
            .entry(collection.to_string())
            .or_insert(0) += packages as u64;
    }

    /// Record one failed shipment
    pub fn record_failure(&mut self) {
        self.total_failed += 1;
    }

    /// Record one throttled dispatch attempt
    pub fn record_throttled(&mut self) {
        self.total_throttled += 1;
    }

    /// Build the summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_shipments: self.total_shipments,
            total_packages: self.total_packages,
            total_failed: self.total_failed,
            total_throttled: self.total_throttled,
            failure_rate: if self.total_shipments > 0 {
                self.total_failed as f64 / self.total_shipments as f64 * 100.0
            } else {
                0.0
            },
            shipment_size: StatsSummary::from(&self.size_stats),
            collection_counts: self.collection_counts.clone(),
        }
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Summary report
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_shipments: u64,
    pub total_packages: u64,
    pub total_failed: u64,
    pub total_throttled: u64,
    pub failure_rate: f64,
    pub shipment_size: StatsSummary,
    pub collection_counts: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Shipments: {}", self.total_shipments)?;
        writeln!(f, "Packages: {}", self.total_packages)?;
        writeln!(
            f,
            "Failed shipments: {} ({:.2}%)",
            self.total_failed, self.failure_rate
        )?;
        writeln!(f, "Throttled attempts: {}", self.total_throttled)?;
        writeln!(f, "Shipment size: {}", self.shipment_size)?;

        if !self.collection_counts.is_empty() {
            writeln!(f, "Packages per collection:")?;
            for (collection, count) in &self.collection_counts {
                writeln!(f, "  {}: {}", collection, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        stats.push(1.0);
        stats.push(2.0);
        stats.push(3.0);
        stats.push(4.0);
        stats.push(5.0);

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = DispatchStatsAggregator::new();

        aggregator.record_dispatch("users", 10);
        aggregator.record_dispatch("users", 4);
        aggregator.record_dispatch("orders", 6);
        aggregator.record_failure();
        aggregator.record_throttled();

        assert_eq!(aggregator.total_shipments, 3);
        assert_eq!(aggregator.total_packages, 20);
        assert_eq!(aggregator.total_failed, 1);
        assert_eq!(aggregator.total_throttled, 1);
        assert_eq!(aggregator.collection_counts.get("users"), Some(&14));
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = DispatchStatsAggregator::new();
        aggregator.record_dispatch("users", 10);
        aggregator.record_failure();

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Shipments: 1"));
        assert!(output.contains("100.00%"));
        assert!(output.contains("users: 10"));
    }
}
