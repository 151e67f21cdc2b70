//! Prometheus metrics registry for blob-bridge.

use parking_lot::RwLock;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;
use std::time::Instant;

use super::labels::{
    BackendLabels, CopyLabels, ErrorType, OperationStatus, StorageErrorLabels, StorageLabels,
    StorageOperation,
};
use crate::copy::{CopyStatistics, EmptyResult};

/// Storage latency histogram buckets (in seconds).
/// Covers local disk through cloud storage: 1ms to 10s.
const STORAGE_LATENCY_BUCKETS: [f64; 11] = [
    0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Run duration histogram buckets (in seconds).
const RUN_DURATION_BUCKETS: [f64; 10] = [
    1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0,
];

/// Prometheus metrics registry for storage and copy activity.
pub struct StorageMetrics {
    /// Internal prometheus-client registry.
    registry: RwLock<Registry>,

    /// Latency of every storage call, by backend and operation.
    pub operation_latency_seconds: Family<StorageLabels, Histogram>,

    /// Cumulative bytes read from storage.
    pub read_bytes_total: Family<BackendLabels, Counter>,

    /// Cumulative bytes written to storage.
    pub write_bytes_total: Family<BackendLabels, Counter>,

    /// Cumulative items returned by enumeration.
    pub enumerated_items_total: Family<BackendLabels, Counter>,

    /// Storage operation errors by type.
    pub errors_total: Family<StorageErrorLabels, Counter>,

    /// Blobs written by copy runs.
    pub copied_blobs_total: Family<CopyLabels, Counter>,

    /// Bytes written by copy runs.
    pub copied_bytes_total: Family<CopyLabels, Counter>,

    /// Copy run duration.
    pub copy_duration_seconds: Family<CopyLabels, Histogram>,

    /// Blobs deleted by drain runs.
    pub drained_blobs_total: Family<BackendLabels, Counter>,

    start_time: Instant,
}

impl Default for StorageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageMetrics {
    /// Create a new registry with every metric family registered.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let operation_latency_seconds =
            Family::<StorageLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(STORAGE_LATENCY_BUCKETS.iter().cloned())
            });
        let read_bytes_total = Family::<BackendLabels, Counter>::default();
        let write_bytes_total = Family::<BackendLabels, Counter>::default();
        let enumerated_items_total = Family::<BackendLabels, Counter>::default();
        let errors_total = Family::<StorageErrorLabels, Counter>::default();
        let copied_blobs_total = Family::<CopyLabels, Counter>::default();
        let copied_bytes_total = Family::<CopyLabels, Counter>::default();
        let copy_duration_seconds = Family::<CopyLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(RUN_DURATION_BUCKETS.iter().cloned())
        });
        let drained_blobs_total = Family::<BackendLabels, Counter>::default();

        registry.register(
            "blob_bridge_storage_operation_latency_seconds",
            "Latency of storage operations",
            operation_latency_seconds.clone(),
        );
        registry.register(
            "blob_bridge_storage_read_bytes",
            "Bytes read from storage",
            read_bytes_total.clone(),
        );
        registry.register(
            "blob_bridge_storage_write_bytes",
            "Bytes written to storage",
            write_bytes_total.clone(),
        );
        registry.register(
            "blob_bridge_storage_enumerated_items",
            "Items returned by enumeration",
            enumerated_items_total.clone(),
        );
        registry.register(
            "blob_bridge_storage_errors",
            "Storage operation errors by type",
            errors_total.clone(),
        );
        registry.register(
            "blob_bridge_copy_blobs",
            "Blobs written by copy runs",
            copied_blobs_total.clone(),
        );
        registry.register(
            "blob_bridge_copy_bytes",
            "Bytes written by copy runs",
            copied_bytes_total.clone(),
        );
        registry.register(
            "blob_bridge_copy_duration_seconds",
            "Copy run duration",
            copy_duration_seconds.clone(),
        );
        registry.register(
            "blob_bridge_drain_blobs",
            "Blobs deleted by drain runs",
            drained_blobs_total.clone(),
        );

        Self {
            registry: RwLock::new(registry),
            operation_latency_seconds,
            read_bytes_total,
            write_bytes_total,
            enumerated_items_total,
            errors_total,
            copied_blobs_total,
            copied_bytes_total,
            copy_duration_seconds,
            drained_blobs_total,
            start_time: Instant::now(),
        }
    }

    /// Record the latency of one storage call.
    pub fn record_latency(&self, backend: &str, operation: StorageOperation, latency_secs: f64) {
        let labels = StorageLabels::new(backend, operation);
        self.operation_latency_seconds
            .get_or_create(&labels)
            .observe(latency_secs);
    }

    /// Increment storage read bytes counter.
    pub fn inc_read_bytes(&self, backend: &str, bytes: u64) {
        self.read_bytes_total
            .get_or_create(&BackendLabels::new(backend))
            .inc_by(bytes);
    }

    /// Increment storage write bytes counter.
    pub fn inc_write_bytes(&self, backend: &str, bytes: u64) {
        self.write_bytes_total
            .get_or_create(&BackendLabels::new(backend))
            .inc_by(bytes);
    }

    /// Increment enumerated items counter.
    pub fn inc_enumerated(&self, backend: &str, items: u64) {
        self.enumerated_items_total
            .get_or_create(&BackendLabels::new(backend))
            .inc_by(items);
    }

    /// Record a failed storage call.
    pub fn inc_error(&self, backend: &str, operation: StorageOperation, error: &crate::Error) {
        let labels = StorageErrorLabels::new(backend, operation, ErrorType::from_error(error));
        self.errors_total.get_or_create(&labels).inc();
    }

    /// Record the outcome of a copy run.
    pub fn record_copy(&self, source: &str, destination: &str, stats: &CopyStatistics) {
        let labels = CopyLabels::new(
            source,
            destination,
            OperationStatus::from_success(stats.success),
        );
        self.copied_blobs_total
            .get_or_create(&labels)
            .inc_by(stats.blobs_written);
        self.copied_bytes_total
            .get_or_create(&labels)
            .inc_by(stats.bytes_written);
        if let Some(duration) = stats.time.duration() {
            let secs = duration.num_milliseconds().max(0) as f64 / 1000.0;
            self.copy_duration_seconds
                .get_or_create(&labels)
                .observe(secs);
        }
    }

    /// Record the outcome of a drain run.
    pub fn record_empty(&self, backend: &str, result: &EmptyResult) {
        self.drained_blobs_total
            .get_or_create(&BackendLabels::new(backend))
            .inc_by(result.count() as u64);
    }

    /// Get elapsed time since metrics collection started.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Encode all metrics to Prometheus text format.
    pub fn encode(&self) -> String {
        let registry = self.registry.read();
        let mut buffer = String::new();
        if encode(&mut buffer, &registry).is_err() {
            return String::new();
        }
        buffer
    }
}

/// A guard that records operation latency when dropped.
pub struct TimerGuard<'a> {
    metrics: &'a StorageMetrics,
    backend: &'a str,
    operation: StorageOperation,
    start: Instant,
}

impl<'a> TimerGuard<'a> {
    pub fn new(metrics: &'a StorageMetrics, backend: &'a str, operation: StorageOperation) -> Self {
        Self {
            metrics,
            backend,
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        let latency = self.start.elapsed().as_secs_f64();
        self.metrics
            .record_latency(self.backend, self.operation, latency);
    }
}
