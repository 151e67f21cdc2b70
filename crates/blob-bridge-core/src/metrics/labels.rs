//! Label types for Prometheus metrics.
//!
//! This module defines the label types used for metrics dimensions,
//! following the prometheus-client crate patterns.

use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use std::fmt::Write;

use crate::error::StorageError;

/// Labels for storage operation latency.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StorageLabels {
    pub backend: String,
    pub operation: StorageOperation,
}

impl StorageLabels {
    pub fn new(backend: impl Into<String>, operation: StorageOperation) -> Self {
        Self {
            backend: backend.into(),
            operation,
        }
    }
}

/// Labels for per-backend byte and item counters.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct BackendLabels {
    pub backend: String,
}

impl BackendLabels {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
        }
    }
}

/// Labels for storage error metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StorageErrorLabels {
    pub backend: String,
    pub operation: StorageOperation,
    pub error_type: ErrorType,
}

impl StorageErrorLabels {
    pub fn new(
        backend: impl Into<String>,
        operation: StorageOperation,
        error_type: ErrorType,
    ) -> Self {
        Self {
            backend: backend.into(),
            operation,
            error_type,
        }
    }
}

/// Labels for copy job metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CopyLabels {
    pub source: String,
    pub destination: String,
    pub status: OperationStatus,
}

impl CopyLabels {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        status: OperationStatus,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            status,
        }
    }
}

/// Operation status for run metrics.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum OperationStatus {
    Success,
    Failure,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Success => "success",
            OperationStatus::Failure => "failure",
        }
    }

    pub fn from_success(success: bool) -> Self {
        if success {
            OperationStatus::Success
        } else {
            OperationStatus::Failure
        }
    }
}

impl EncodeLabelValue for OperationStatus {
    fn encode(
        &self,
        encoder: &mut prometheus_client::encoding::LabelValueEncoder,
    ) -> std::result::Result<(), std::fmt::Error> {
        encoder.write_str(self.as_str())
    }
}

/// Error type classification for metrics.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ErrorType {
    NotFound,
    InvalidArgument,
    InvalidPath,
    DirectoryNotEmpty,
    StorageIo,
    Timeout,
    Quota,
    Serialization,
    Config,
    Cancelled,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::NotFound => "not_found",
            ErrorType::InvalidArgument => "invalid_argument",
            ErrorType::InvalidPath => "invalid_path",
            ErrorType::DirectoryNotEmpty => "directory_not_empty",
            ErrorType::StorageIo => "storage_io",
            ErrorType::Timeout => "timeout",
            ErrorType::Quota => "quota",
            ErrorType::Serialization => "serialization",
            ErrorType::Config => "config",
            ErrorType::Cancelled => "cancelled",
        }
    }

    /// Classify an error into an error type.
    pub fn from_error(error: &crate::Error) -> Self {
        match error {
            crate::Error::Storage(storage_err) => Self::classify_storage_error(storage_err),
            crate::Error::InvalidArgument(_) => ErrorType::InvalidArgument,
            crate::Error::Serialization(_) => ErrorType::Serialization,
            crate::Error::Io(_) => ErrorType::StorageIo,
            crate::Error::Config(_) => ErrorType::Config,
            crate::Error::Cancelled => ErrorType::Cancelled,
        }
    }

    fn classify_storage_error(error: &StorageError) -> Self {
        match error {
            StorageError::NotFound(_) => ErrorType::NotFound,
            StorageError::DirectoryNotEmpty(_) => ErrorType::DirectoryNotEmpty,
            StorageError::InvalidPath(_) => ErrorType::InvalidPath,
            StorageError::Backend(msg) => {
                let msg_lower = msg.to_lowercase();
                if msg_lower.contains("timeout") || msg_lower.contains("timed out") {
                    ErrorType::Timeout
                } else if msg_lower.contains("quota")
                    || msg_lower.contains("rate limit")
                    || msg_lower.contains("slowdown")
                {
                    ErrorType::Quota
                } else {
                    ErrorType::StorageIo
                }
            }
        }
    }
}

impl EncodeLabelValue for ErrorType {
    fn encode(
        &self,
        encoder: &mut prometheus_client::encoding::LabelValueEncoder,
    ) -> std::result::Result<(), std::fmt::Error> {
        encoder.write_str(self.as_str())
    }
}

/// Storage contract operation a measurement belongs to.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum StorageOperation {
    Get,
    GetStream,
    Head,
    Write,
    WriteStream,
    Delete,
    Enumerate,
}

impl StorageOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::Get => "get",
            StorageOperation::GetStream => "get_stream",
            StorageOperation::Head => "head",
            StorageOperation::Write => "write",
            StorageOperation::WriteStream => "write_stream",
            StorageOperation::Delete => "delete",
            StorageOperation::Enumerate => "enumerate",
        }
    }
}

impl EncodeLabelValue for StorageOperation {
    fn encode(
        &self,
        encoder: &mut prometheus_client::encoding::LabelValueEncoder,
    ) -> std::result::Result<(), std::fmt::Error> {
        encoder.write_str(self.as_str())
    }
}
