//! Cross-backend copy and drain.
//!
//! Everything here is written against [`StorageClient`](crate::storage::StorageClient)
//! only, so any pair of backends can be bridged.

pub mod engine;

pub use engine::{empty, BlobCopy, CopyStatistics, EmptyResult, Logger, RunTime};
