//! In-memory storage backend for testing.

use object_store::memory::InMemory;
use std::sync::Arc;

use super::object::{delegate_object_store, ObjectStoreBackend};

/// In-memory storage backend using object_store
///
/// This backend is primarily useful for testing purposes as it doesn't
/// persist data between runs. It behaves like a flat object store: no
/// folders, native marker pagination.
pub struct MemoryBackend {
    inner: ObjectStoreBackend,
}

impl MemoryBackend {
    /// Create a new in-memory storage backend
    pub fn new() -> Self {
        Self {
            inner: ObjectStoreBackend::new(
                "memory",
                "Memory",
                Arc::new(InMemory::new()),
                None,
                "memory:///",
            ),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

delegate_object_store!(MemoryBackend);
