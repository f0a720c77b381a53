//! Cached artifact payload.

use std::sync::Arc;

/// An immutable cached byte payload, typically a rendered bitmap.
///
/// The bytes are shared, so cloning is cheap; cache hits and concurrent
/// waiters hand out clones of the same allocation. An artifact is never
/// mutated in place; a new render replaces the cache slot wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    data: Arc<[u8]>,
}

impl Artifact {
    /// Create an artifact from raw bytes.
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    /// The artifact bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Size of the artifact in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the artifact is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for Artifact {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for Artifact {
    fn from(data: &[u8]) -> Self {
        Self::new(data)
    }
}
