//! Media buffers.
//!
//! A [`Buffer`] pairs an immutable, reference-counted payload with its
//! [`Metadata`]. Cloning is O(1).

use crate::metadata::Metadata;
use bytes::Bytes;

/// A unit of media data flowing through a pipeline.
///
/// # Example
///
/// ```rust
/// use decproxy::buffer::Buffer;
/// use decproxy::metadata::Metadata;
///
/// let buffer = Buffer::from_bytes(vec![0u8; 188], Metadata::with_sequence(3));
/// assert_eq!(buffer.len(), 188);
/// assert_eq!(buffer.metadata().sequence, 3);
/// ```
#[derive(Debug, Clone)]
pub struct Buffer {
    data: Bytes,
    metadata: Metadata,
}

impl Buffer {
    /// Create a new buffer from a payload and metadata.
    pub fn new(data: Bytes, metadata: Metadata) -> Self {
        Self { data, metadata }
    }

    /// Create a buffer by copying/moving any byte container.
    pub fn from_bytes(data: impl Into<Bytes>, metadata: Metadata) -> Self {
        Self::new(data.into(), metadata)
    }

    /// Create a buffer with no payload.
    pub fn empty(metadata: Metadata) -> Self {
        Self::new(Bytes::new(), metadata)
    }

    /// Get a reference to the buffer's metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Get a mutable reference to the buffer's metadata.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Get the payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Get the payload as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Get the length of the payload.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Create a sub-buffer sharing the same payload.
    ///
    /// # Panics
    ///
    /// Panics if `offset + len > self.len()`.
    pub fn slice(&self, offset: usize, len: usize) -> Buffer {
        Buffer {
            data: self.data.slice(offset..offset + len),
            metadata: self.metadata.clone(),
        }
    }
}
