//! Prometheus metrics for storage and copy activity.
//!
//! - [`labels`] - Label types for metric dimensions
//! - [`registry`] - The `StorageMetrics` registry
//! - [`instrumented`] - Storage client decorator that records every call
//!
//! ```rust,ignore
//! use blob_bridge_core::metrics::{instrument, StorageMetrics};
//!
//! let metrics = Arc::new(StorageMetrics::new());
//! let client = instrument(create_backend_from_url("file:///data")?, metrics.clone());
//! // ... use client ...
//! println!("{}", metrics.encode());
//! ```

pub mod instrumented;
pub mod labels;
pub mod registry;

pub use instrumented::{instrument, InstrumentedStorageClient};
pub use labels::{
    BackendLabels, CopyLabels, ErrorType, OperationStatus, StorageErrorLabels, StorageLabels,
    StorageOperation,
};
pub use registry::{StorageMetrics, TimerGuard};
