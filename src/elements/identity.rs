//! Identity element with counters and an inspection callback.
//!
//! Used as the fixed front and back stages of a proxy node, and as a
//! pass-through decoder for tests.

use crate::buffer::Buffer;
use crate::element::{DecoderElement, ElementState, Output};
use crate::error::Result;
use crate::event::{Event, PipelineItem};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Callback type for item inspection.
pub type ItemCallback = Box<dyn Fn(&PipelineItem) + Send + Sync>;

/// An identity element that passes items through unchanged while
/// counting them and optionally calling a callback.
///
/// # Example
///
/// ```rust
/// use decproxy::elements::Identity;
/// use decproxy::buffer::Buffer;
/// use decproxy::metadata::Metadata;
///
/// let front = Identity::new().with_name("front");
/// front.observe(&Buffer::from_bytes(vec![0u8; 4], Metadata::new()).into());
/// assert_eq!(front.buffer_count(), 1);
/// assert_eq!(front.byte_count(), 4);
/// ```
pub struct Identity {
    name: String,
    factory: String,
    callback: Option<Arc<ItemCallback>>,
    buffers: AtomicU64,
    bytes: AtomicU64,
    events: AtomicU64,
    state: ElementState,
}

impl Identity {
    /// Create a new identity element.
    pub fn new() -> Self {
        Self {
            name: "identity".to_string(),
            factory: "identity".to_string(),
            callback: None,
            buffers: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            events: AtomicU64::new(0),
            state: ElementState::Null,
        }
    }

    /// Set a custom name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Report a different factory name (for pass-through test decoders).
    pub fn with_factory_name(mut self, factory: impl Into<String>) -> Self {
        self.factory = factory.into();
        self
    }

    /// Set a callback to be called for each item.
    pub fn on_item<F>(mut self, callback: F) -> Self
    where
        F: Fn(&PipelineItem) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(Box::new(callback)));
        self
    }

    /// Count an item passing through this stage.
    pub fn observe(&self, item: &PipelineItem) {
        match item {
            PipelineItem::Buffer(b) => {
                self.buffers.fetch_add(1, Ordering::Relaxed);
                self.bytes.fetch_add(b.len() as u64, Ordering::Relaxed);
            }
            PipelineItem::Event(_) => {
                self.events.fetch_add(1, Ordering::Relaxed);
            }
        }
        if let Some(ref cb) = self.callback {
            cb(item);
        }
    }

    /// Count a buffer without wrapping it.
    pub fn observe_buffer(&self, buffer: &Buffer) {
        self.buffers.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(buffer.len() as u64, Ordering::Relaxed);
        if let Some(ref cb) = self.callback {
            cb(&PipelineItem::Buffer(buffer.clone()));
        }
    }

    /// Count an event without wrapping it.
    pub fn observe_event(&self, event: &Event) {
        self.events.fetch_add(1, Ordering::Relaxed);
        if let Some(ref cb) = self.callback {
            cb(&PipelineItem::Event(event.clone()));
        }
    }

    /// Get the number of buffers seen.
    pub fn buffer_count(&self) -> u64 {
        self.buffers.load(Ordering::Relaxed)
    }

    /// Get the total bytes seen.
    pub fn byte_count(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Get the number of events seen.
    pub fn event_count(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    /// Get statistics.
    pub fn stats(&self) -> IdentityStats {
        IdentityStats {
            buffer_count: self.buffer_count(),
            byte_count: self.byte_count(),
            event_count: self.event_count(),
        }
    }

    /// Reset statistics.
    pub fn reset_stats(&self) {
        self.buffers.store(0, Ordering::Relaxed);
        self.bytes.store(0, Ordering::Relaxed);
        self.events.store(0, Ordering::Relaxed);
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderElement for Identity {
    fn name(&self) -> &str {
        &self.name
    }

    fn factory_name(&self) -> &str {
        &self.factory
    }

    fn chain(&mut self, buffer: Buffer) -> Result<Output> {
        let item = PipelineItem::Buffer(buffer);
        self.observe(&item);
        Ok(Output::Single(item))
    }

    fn sink_event(&mut self, event: Event) -> Result<Output> {
        let item = PipelineItem::Event(event);
        self.observe(&item);
        Ok(Output::Single(item))
    }

    fn set_state(&mut self, state: ElementState) -> Result<()> {
        self.state = state;
        Ok(())
    }

    fn state(&self) -> ElementState {
        self.state
    }
}

/// Statistics for Identity element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityStats {
    /// Number of buffers seen.
    pub buffer_count: u64,
    /// Total bytes seen.
    pub byte_count: u64,
    /// Number of events seen.
    pub event_count: u64,
}
