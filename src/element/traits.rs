//! Core element traits.

use super::state::ElementState;
use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::event::{Event, PipelineItem};
use crate::format::Value;

// ============================================================================
// Output Type
// ============================================================================

/// Output of element processing.
///
/// Represents what an element produced for one input:
/// - `None`: No output (buffer was consumed/dropped)
/// - `Single`: One output item
/// - `Multiple`: Several items, in stream order
///
/// Items are buffers or serialized events, so a decoder can answer a
/// buffer with a gap event or flush held frames ahead of an EOS.
///
/// # Examples
///
/// ```rust
/// use decproxy::element::Output;
/// use decproxy::event::Event;
///
/// let mut out = Output::none();
/// assert!(out.is_empty());
///
/// out.push(Event::Eos);
/// assert_eq!(out.len(), 1);
/// ```
#[derive(Debug, Default)]
pub enum Output {
    /// No output.
    #[default]
    None,
    /// Single output item.
    Single(PipelineItem),
    /// Multiple output items.
    Multiple(Vec<PipelineItem>),
}

impl Output {
    /// Create an empty output.
    #[inline]
    pub fn none() -> Self {
        Self::None
    }

    /// Create a single buffer output.
    #[inline]
    pub fn buffer(buf: Buffer) -> Self {
        Self::Single(PipelineItem::Buffer(buf))
    }

    /// Create a single event output.
    #[inline]
    pub fn event(event: Event) -> Self {
        Self::Single(PipelineItem::Event(event))
    }

    /// Append an item, keeping order.
    pub fn push(&mut self, item: impl Into<PipelineItem>) {
        let item = item.into();
        *self = match std::mem::take(self) {
            Self::None => Self::Single(item),
            Self::Single(first) => Self::Multiple(vec![first, item]),
            Self::Multiple(mut v) => {
                v.push(item);
                Self::Multiple(v)
            }
        };
    }

    /// Check if there is no output.
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Get the number of output items.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Single(_) => 1,
            Self::Multiple(v) => v.len(),
        }
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert to a Vec of items.
    pub fn into_vec(self) -> Vec<PipelineItem> {
        match self {
            Self::None => vec![],
            Self::Single(i) => vec![i],
            Self::Multiple(v) => v,
        }
    }
}

impl From<Buffer> for Output {
    #[inline]
    fn from(b: Buffer) -> Self {
        Self::buffer(b)
    }
}

impl From<Event> for Output {
    #[inline]
    fn from(e: Event) -> Self {
        Self::event(e)
    }
}

impl From<Vec<PipelineItem>> for Output {
    fn from(mut v: Vec<PipelineItem>) -> Self {
        match v.len() {
            0 => Self::None,
            1 => v.pop().map_or(Self::None, Self::Single),
            _ => Self::Multiple(v),
        }
    }
}

impl FromIterator<PipelineItem> for Output {
    fn from_iter<I: IntoIterator<Item = PipelineItem>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

impl IntoIterator for Output {
    type Item = PipelineItem;
    type IntoIter = std::vec::IntoIter<PipelineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

// ============================================================================
// Decoder Element Trait
// ============================================================================

/// A decoder instance that can be linked into a running pipeline.
///
/// Decoders are synchronous: every call returns what the element produced
/// for that input, and the caller forwards it downstream. An element that
/// holds data internally must emit it before forwarding an `Eos`, which is
/// how a hot-swap drains it.
///
/// # Example
///
/// ```rust,ignore
/// struct Discard { state: ElementState }
///
/// impl DecoderElement for Discard {
///     fn name(&self) -> &str { "discard0" }
///     fn factory_name(&self) -> &str { "discard" }
///     fn chain(&mut self, _buffer: Buffer) -> Result<Output> {
///         Ok(Output::none())
///     }
///     fn sink_event(&mut self, event: Event) -> Result<Output> {
///         Ok(event.into())
///     }
///     fn set_state(&mut self, state: ElementState) -> Result<()> {
///         self.state = state;
///         Ok(())
///     }
///     fn state(&self) -> ElementState { self.state }
/// }
/// ```
pub trait DecoderElement: Send {
    /// Instance name (for logging).
    fn name(&self) -> &str;

    /// Name of the factory that created this instance.
    fn factory_name(&self) -> &str;

    /// Process one input buffer.
    fn chain(&mut self, buffer: Buffer) -> Result<Output>;

    /// Handle an event arriving on the input.
    fn sink_event(&mut self, event: Event) -> Result<Output>;

    /// Handle an event travelling upstream into this element's output.
    ///
    /// Returns `true` when the event was consumed.
    fn src_event(&mut self, _event: Event) -> Result<bool> {
        Ok(false)
    }

    /// Change the running state.
    fn set_state(&mut self, state: ElementState) -> Result<()>;

    /// Current running state.
    fn state(&self) -> ElementState;

    /// Set a named property.
    fn set_property(&mut self, name: &str, _value: Value) -> Result<()> {
        Err(Error::UnknownProperty {
            element: self.name().to_string(),
            property: name.to_string(),
        })
    }

    /// Read a named property.
    fn property(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Whether the element exposes a property with this name.
    fn has_property(&self, _name: &str) -> bool {
        false
    }
}

// ============================================================================
// Pad Target
// ============================================================================

/// A receiver of items on the downstream side of a link.
///
/// Implementations may be called from any streaming thread. They may also
/// call back into the upstream element (for example to send an upstream
/// event) from inside `push`.
pub trait PadTarget: Send + Sync {
    /// Deliver one item.
    fn push(&self, item: PipelineItem) -> Result<()>;
}
