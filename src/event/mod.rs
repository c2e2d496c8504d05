//! Events that flow through a pipeline alongside buffers.
//!
//! # Event Types
//!
//! Events are categorized by their flow direction:
//!
//! - **Downstream events**: Flow with data (stream-start, caps, segment,
//!   tags, gap, EOS)
//! - **Upstream events**: Flow against data (custom upstream requests such
//!   as resource activation)
//! - **Bidirectional events**: Flush start/stop
//!
//! # Serialization
//!
//! Serialized events keep their position relative to buffers; flush events
//! bypass data and take effect immediately.
//!
//! # Stickiness
//!
//! Stream-start, caps, segment and tags are *sticky*: the last one of each
//! kind describes the stream and is replayed to any element linked later.
//!
//! # Example
//!
//! ```rust
//! use decproxy::event::{Event, TagList, TagsEvent};
//!
//! let mut tags = TagList::new();
//! tags.set("video-codec", "H.264");
//!
//! let event = Event::Tags(TagsEvent::new(tags));
//! assert!(event.is_downstream());
//! assert!(event.is_sticky());
//! ```

mod tags;

pub use tags::{TagList, TagMergeMode, tag_names};

use crate::buffer::Buffer;
use crate::format::{Caps, Structure};
use std::time::Duration;

// ============================================================================
// Event Enum
// ============================================================================

/// Events that flow through the pipeline.
#[derive(Debug, Clone)]
pub enum Event {
    // ========== Downstream Events ==========
    /// Start of a new stream.
    StreamStart(StreamStartEvent),

    /// Format of the data that follows.
    Caps(Caps),

    /// Defines a playback segment (timeline and rate).
    Segment(SegmentEvent),

    /// Stream tags.
    Tags(TagsEvent),

    /// Gap in data (silence, no frames).
    Gap(GapEvent),

    /// End of stream - no more data will be produced.
    Eos,

    /// Custom event travelling with data.
    CustomDownstream(Structure),

    // ========== Upstream Events ==========
    /// Custom event travelling against data.
    CustomUpstream(Structure),

    // ========== Bidirectional Events ==========
    /// Flush start - immediately discard buffered data.
    FlushStart,

    /// Flush stop - resume normal operation.
    FlushStop,
}

impl Event {
    /// Check if this is a downstream event (flows with data).
    pub fn is_downstream(&self) -> bool {
        matches!(
            self,
            Event::StreamStart(_)
                | Event::Caps(_)
                | Event::Segment(_)
                | Event::Tags(_)
                | Event::Gap(_)
                | Event::Eos
                | Event::CustomDownstream(_)
        )
    }

    /// Check if this is an upstream event (flows against data).
    pub fn is_upstream(&self) -> bool {
        matches!(self, Event::CustomUpstream(_))
    }

    /// Check if this event should be serialized with buffers.
    pub fn is_serialized(&self) -> bool {
        !matches!(self, Event::FlushStart | Event::FlushStop)
    }

    /// Check if this event is sticky (replayed to newly linked elements).
    pub fn is_sticky(&self) -> bool {
        matches!(
            self,
            Event::StreamStart(_) | Event::Caps(_) | Event::Segment(_) | Event::Tags(_)
        )
    }

    /// Structure of a custom event.
    pub fn structure(&self) -> Option<&Structure> {
        match self {
            Event::CustomUpstream(s) | Event::CustomDownstream(s) => Some(s),
            _ => None,
        }
    }

    /// Check whether this is a custom event with the given name.
    pub fn has_name(&self, name: &str) -> bool {
        self.structure().is_some_and(|s| s.has_name(name))
    }

    /// Get a human-readable name for this event type.
    pub fn name(&self) -> &str {
        match self {
            Event::StreamStart(_) => "stream-start",
            Event::Caps(_) => "caps",
            Event::Segment(_) => "segment",
            Event::Tags(_) => "tags",
            Event::Gap(_) => "gap",
            Event::Eos => "eos",
            Event::FlushStart => "flush-start",
            Event::FlushStop => "flush-stop",
            Event::CustomDownstream(s) | Event::CustomUpstream(s) => s.name(),
        }
    }
}

// ============================================================================
// Stream Start Event
// ============================================================================

/// Stream start event - begins a new logical stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamStartEvent {
    /// Unique stream identifier.
    pub stream_id: String,
    /// Group the stream belongs to, if any.
    pub group_id: Option<u32>,
}

impl StreamStartEvent {
    /// Create a new stream start event.
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
            group_id: None,
        }
    }
}

// ============================================================================
// Segment Event
// ============================================================================

/// Segment event - defines the playback timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentEvent {
    /// Segment start position.
    pub start: Duration,
    /// Segment stop position, unbounded when `None`.
    pub stop: Option<Duration>,
    /// Current position in segment.
    pub position: Duration,
    /// Playback rate (1.0 = normal speed, negative = reverse).
    pub rate: f64,
    /// Rate already applied upstream.
    pub applied_rate: f64,
}

impl SegmentEvent {
    /// Create a new time-based segment.
    pub fn new_time(start: Duration, stop: Option<Duration>) -> Self {
        Self {
            start,
            stop,
            position: start,
            rate: 1.0,
            applied_rate: 1.0,
        }
    }

    /// Set the playback rate.
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Whether the rate is far enough from normal speed to be trick play.
    ///
    /// Fast-forward beyond 2x and any reverse playback qualify.
    pub fn is_trick_mode(&self) -> bool {
        (self.rate - 1.0).abs() > 1.0
    }
}

impl Default for SegmentEvent {
    fn default() -> Self {
        Self::new_time(Duration::ZERO, None)
    }
}

// ============================================================================
// Tags Event
// ============================================================================

/// Tags event - stream metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct TagsEvent {
    /// The tag list.
    pub tags: TagList,
    /// How to merge with existing tags.
    pub mode: TagMergeMode,
}

impl TagsEvent {
    /// Create a new tags event.
    pub fn new(tags: TagList) -> Self {
        Self {
            tags,
            mode: TagMergeMode::default(),
        }
    }
}

// ============================================================================
// Gap Event
// ============================================================================

/// Gap event - indicates no data for a period.
///
/// Keeps downstream timing moving when no buffer is produced for a span
/// of the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapEvent {
    /// Start of the gap.
    pub timestamp: Duration,
    /// Duration of the gap, if known.
    pub duration: Option<Duration>,
}

impl GapEvent {
    /// Create a new gap event.
    pub fn new(timestamp: Duration, duration: Option<Duration>) -> Self {
        Self {
            timestamp,
            duration,
        }
    }
}

// ============================================================================
// Pipeline Item
// ============================================================================

/// Either a buffer or an event, in stream order.
#[derive(Debug, Clone)]
pub enum PipelineItem {
    /// A data buffer.
    Buffer(Buffer),
    /// An event.
    Event(Event),
}

impl PipelineItem {
    /// Check if this is a buffer.
    pub fn is_buffer(&self) -> bool {
        matches!(self, PipelineItem::Buffer(_))
    }

    /// Check if this is an event.
    pub fn is_event(&self) -> bool {
        matches!(self, PipelineItem::Event(_))
    }

    /// Check if this is an EOS event.
    pub fn is_eos(&self) -> bool {
        matches!(self, PipelineItem::Event(Event::Eos))
    }

    /// Get as buffer reference.
    pub fn as_buffer(&self) -> Option<&Buffer> {
        match self {
            PipelineItem::Buffer(b) => Some(b),
            _ => None,
        }
    }

    /// Get as event reference.
    pub fn as_event(&self) -> Option<&Event> {
        match self {
            PipelineItem::Event(e) => Some(e),
            _ => None,
        }
    }

    /// Convert into buffer.
    pub fn into_buffer(self) -> Option<Buffer> {
        match self {
            PipelineItem::Buffer(b) => Some(b),
            _ => None,
        }
    }
}

impl From<Buffer> for PipelineItem {
    fn from(buffer: Buffer) -> Self {
        PipelineItem::Buffer(buffer)
    }
}

impl From<Event> for PipelineItem {
    fn from(event: Event) -> Self {
        PipelineItem::Event(event)
    }
}
