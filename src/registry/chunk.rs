//! Chunk type for stream routing
//!
//! A chunk is the unit handed from an inlet to every outlet. It is created
//! once per delivery event and never mutated afterwards.

use bytes::Bytes;

/// An immutable run of bytes produced by one delivery event
///
/// This is designed to be cheap to clone due to `Bytes` reference counting:
/// every outlet that receives the same chunk shares one allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    data: Bytes,
}

impl Chunk {
    /// Create a chunk by copying the given bytes once
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self {
            data: Bytes::copy_from_slice(data),
        }
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the chunk carries no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the chunk contents
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Split the chunk at `at`
    ///
    /// Returns the first `at` bytes and a view over the unconsumed remainder.
    /// Both halves share the original backing storage.
    pub fn split_at(&self, at: usize) -> (Chunk, Chunk) {
        let at = at.min(self.data.len());
        (
            Chunk::from(self.data.slice(..at)),
            Chunk::from(self.data.slice(at..)),
        )
    }
}

impl From<Bytes> for Chunk {
    fn from(data: Bytes) -> Self {
        Self { data }
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(data: Vec<u8>) -> Self {
        Self { data: data.into() }
    }
}

impl From<Chunk> for Bytes {
    fn from(chunk: Chunk) -> Self {
        chunk.data
    }
}

impl AsRef<[u8]> for Chunk {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
