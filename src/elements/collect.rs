//! A pad target that records everything pushed into it.

use crate::buffer::Buffer;
use crate::element::PadTarget;
use crate::error::Result;
use crate::event::{Event, PipelineItem};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Collects items pushed downstream.
///
/// Acts as the sink end of a link in tests and inside proxy elements.
#[derive(Debug, Default)]
pub struct ItemCollector {
    items: Mutex<Vec<PipelineItem>>,
}

impl ItemCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PipelineItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take every collected item, leaving the collector empty.
    pub fn take(&self) -> Vec<PipelineItem> {
        std::mem::take(&mut *self.lock())
    }

    /// Snapshot of the collected items.
    pub fn items(&self) -> Vec<PipelineItem> {
        self.lock().clone()
    }

    /// Collected buffers, in order.
    pub fn buffers(&self) -> Vec<Buffer> {
        self.lock()
            .iter()
            .filter_map(|i| i.as_buffer().cloned())
            .collect()
    }

    /// Collected events, in order.
    pub fn events(&self) -> Vec<Event> {
        self.lock()
            .iter()
            .filter_map(|i| i.as_event().cloned())
            .collect()
    }

    /// Number of collected items.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl PadTarget for ItemCollector {
    fn push(&self, item: PipelineItem) -> Result<()> {
        self.lock().push(item);
        Ok(())
    }
}
