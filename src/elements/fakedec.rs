//! Placeholder decoders.
//!
//! A placeholder keeps a stream's topology and timing alive while no real
//! decoder may run. `fakeadec` turns every compressed buffer into a gap
//! (or, in active mode, an empty corrupted buffer so downstream knows the
//! stream is unsupported). `fakevdec` drops everything.

use crate::buffer::Buffer;
use crate::element::{DecoderElement, ElementState, Output};
use crate::error::{Error, Result};
use crate::event::{Event, GapEvent};
use crate::format::{Caps, Structure, Value};
use crate::registry::{ElementFactory, Rank};
use std::time::Duration;

/// Property toggling trick-play / unsupported-stream output.
pub const PROP_ACTIVE_MODE: &str = "active-mode";
/// Property carrying granted resource parameters.
pub const PROP_RESOURCE_INFO: &str = "resource-info";

/// Shared property handling for both placeholders.
#[derive(Debug, Default)]
struct PlaceholderProps {
    active_mode: bool,
    resource_info: Option<Structure>,
}

impl PlaceholderProps {
    fn set(&mut self, element: &str, name: &str, value: Value) -> Result<()> {
        match name {
            PROP_ACTIVE_MODE => {
                self.active_mode = value.as_bool().ok_or_else(|| {
                    Error::InvalidPropertyValue(format!(
                        "{element}: {name} expects bool, got {}",
                        value.type_name()
                    ))
                })?;
            }
            PROP_RESOURCE_INFO => {
                let info = value.as_structure().cloned().ok_or_else(|| {
                    Error::InvalidPropertyValue(format!(
                        "{element}: {name} expects structure, got {}",
                        value.type_name()
                    ))
                })?;
                self.resource_info = Some(info);
            }
            _ => {
                return Err(Error::UnknownProperty {
                    element: element.to_string(),
                    property: name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn get(&self, name: &str) -> Option<Value> {
        match name {
            PROP_ACTIVE_MODE => Some(Value::Bool(self.active_mode)),
            PROP_RESOURCE_INFO => self.resource_info.clone().map(Value::from),
            _ => None,
        }
    }

    fn has(name: &str) -> bool {
        matches!(name, PROP_ACTIVE_MODE | PROP_RESOURCE_INFO)
    }
}

// ============================================================================
// Audio placeholder
// ============================================================================

/// Audio placeholder decoder (`fakeadec`).
pub struct FakeAudioDecoder {
    name: String,
    state: ElementState,
    props: PlaceholderProps,
}

impl FakeAudioDecoder {
    /// Factory name.
    pub const FACTORY: &'static str = "fakeadec";

    /// Create a new audio placeholder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ElementState::Null,
            props: PlaceholderProps::default(),
        }
    }

    /// Whether active (corrupted-marker) mode is on.
    pub fn active_mode(&self) -> bool {
        self.props.active_mode
    }

    fn output_caps(input: &Caps) -> Caps {
        let mut s = Structure::builder("audio/x-raw")
            .field("format", "F32LE")
            .field("layout", "interleaved")
            .build();
        if let Some(input) = input.structure(0) {
            for field in ["rate", "channels"] {
                if let Some(v) = input.get(field) {
                    s.set(field, v.clone());
                }
            }
        }
        Caps::from_structure(s)
    }
}

impl DecoderElement for FakeAudioDecoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn factory_name(&self) -> &str {
        Self::FACTORY
    }

    fn chain(&mut self, buffer: Buffer) -> Result<Output> {
        let meta = buffer.metadata();
        if self.props.active_mode {
            let marker = Buffer::empty(meta.timing().with_corrupted());
            return Ok(Output::buffer(marker));
        }
        let gap = GapEvent::new(meta.pts.unwrap_or(Duration::ZERO), meta.duration);
        Ok(Output::event(Event::Gap(gap)))
    }

    fn sink_event(&mut self, event: Event) -> Result<Output> {
        match event {
            Event::Caps(caps) => Ok(Output::event(Event::Caps(Self::output_caps(&caps)))),
            other => Ok(Output::event(other)),
        }
    }

    fn set_state(&mut self, state: ElementState) -> Result<()> {
        self.state = state;
        Ok(())
    }

    fn state(&self) -> ElementState {
        self.state
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        self.props.set(&self.name, name, value)
    }

    fn property(&self, name: &str) -> Option<Value> {
        self.props.get(name)
    }

    fn has_property(&self, name: &str) -> bool {
        PlaceholderProps::has(name)
    }
}

// ============================================================================
// Video placeholder
// ============================================================================

/// Video placeholder decoder (`fakevdec`).
pub struct FakeVideoDecoder {
    name: String,
    state: ElementState,
    props: PlaceholderProps,
    dropped: u64,
}

impl FakeVideoDecoder {
    /// Factory name.
    pub const FACTORY: &'static str = "fakevdec";

    /// Create a new video placeholder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ElementState::Null,
            props: PlaceholderProps::default(),
            dropped: 0,
        }
    }

    /// Number of buffers discarded.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl DecoderElement for FakeVideoDecoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn factory_name(&self) -> &str {
        Self::FACTORY
    }

    fn chain(&mut self, _buffer: Buffer) -> Result<Output> {
        self.dropped += 1;
        Ok(Output::none())
    }

    fn sink_event(&mut self, event: Event) -> Result<Output> {
        match event {
            Event::Caps(_) => Ok(Output::event(Event::Caps(Caps::new_simple("video/x-raw")))),
            other => Ok(Output::event(other)),
        }
    }

    fn set_state(&mut self, state: ElementState) -> Result<()> {
        self.state = state;
        Ok(())
    }

    fn state(&self) -> ElementState {
        self.state
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        self.props.set(&self.name, name, value)
    }

    fn property(&self, name: &str) -> Option<Value> {
        self.props.get(name)
    }

    fn has_property(&self, name: &str) -> bool {
        PlaceholderProps::has(name)
    }
}

// ============================================================================
// Factories
// ============================================================================

/// Factory for [`FakeAudioDecoder`].
#[derive(Debug, Default)]
pub struct FakeAudioDecoderFactory;

impl ElementFactory for FakeAudioDecoderFactory {
    fn name(&self) -> &str {
        FakeAudioDecoder::FACTORY
    }

    fn klass(&self) -> &str {
        "Codec/Decoder/Audio"
    }

    fn rank(&self) -> Rank {
        Rank::NONE
    }

    fn sink_caps(&self) -> Caps {
        Caps::new_simple("audio/x-media")
    }

    fn create(&self, name: &str) -> Result<Box<dyn DecoderElement>> {
        Ok(Box::new(FakeAudioDecoder::new(name)))
    }
}

/// Factory for [`FakeVideoDecoder`].
#[derive(Debug, Default)]
pub struct FakeVideoDecoderFactory;

impl ElementFactory for FakeVideoDecoderFactory {
    fn name(&self) -> &str {
        FakeVideoDecoder::FACTORY
    }

    fn klass(&self) -> &str {
        "Codec/Decoder/Video"
    }

    fn rank(&self) -> Rank {
        Rank::NONE
    }

    fn sink_caps(&self) -> Caps {
        Caps::new_simple("video/x-media")
    }

    fn create(&self, name: &str) -> Result<Box<dyn DecoderElement>> {
        Ok(Box::new(FakeVideoDecoder::new(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::PipelineItem;
    use crate::metadata::Metadata;

    fn ac3_caps() -> Caps {
        Caps::from_structure(
            Structure::builder("audio/x-ac3")
                .field("rate", 48000)
                .field("channels", 6)
                .build(),
        )
    }

    fn timed_buffer(seq: u64) -> Buffer {
        Buffer::from_bytes(
            vec![0u8; 32],
            Metadata::with_sequence(seq)
                .with_pts(Duration::from_millis(seq * 32))
                .with_duration(Duration::from_millis(32)),
        )
    }

    #[test]
    fn test_fakeadec_output_caps() {
        let mut dec = FakeAudioDecoder::new("a");
        let out = dec.sink_event(Event::Caps(ac3_caps())).unwrap().into_vec();

        let Some(Event::Caps(caps)) = out[0].as_event() else {
            panic!("expected caps");
        };
        let s = caps.structure(0).unwrap();
        assert_eq!(s.name(), "audio/x-raw");
        assert_eq!(s.get_str("format"), Some("F32LE"));
        assert_eq!(s.get_str("layout"), Some("interleaved"));
        assert_eq!(s.get_int("rate"), Some(48000));
        assert_eq!(s.get_int("channels"), Some(6));
    }

    #[test]
    fn test_fakeadec_emits_gaps() {
        let mut dec = FakeAudioDecoder::new("a");
        let out = dec.chain(timed_buffer(2)).unwrap().into_vec();

        match out[0].as_event() {
            Some(Event::Gap(gap)) => {
                assert_eq!(gap.timestamp, Duration::from_millis(64));
                assert_eq!(gap.duration, Some(Duration::from_millis(32)));
            }
            other => panic!("expected gap, got {other:?}"),
        }
    }

    #[test]
    fn test_fakeadec_active_mode_marks_corrupted() {
        let mut dec = FakeAudioDecoder::new("a");
        dec.set_property(PROP_ACTIVE_MODE, Value::Bool(true)).unwrap();
        assert!(dec.active_mode());

        let out = dec.chain(timed_buffer(3)).unwrap().into_vec();
        let buf = out[0].as_buffer().expect("buffer");
        assert!(buf.is_empty());
        assert!(buf.metadata().flags.is_corrupted());
        assert_eq!(buf.metadata().sequence, 3);
        assert_eq!(buf.metadata().pts, Some(Duration::from_millis(96)));
    }

    #[test]
    fn test_fakevdec_discards() {
        let mut dec = FakeVideoDecoder::new("v");
        assert!(dec.chain(timed_buffer(0)).unwrap().is_none());
        assert!(dec.chain(timed_buffer(1)).unwrap().is_none());
        assert_eq!(dec.dropped(), 2);

        let out = dec.sink_event(Event::Eos).unwrap().into_vec();
        assert!(matches!(out[0], PipelineItem::Event(Event::Eos)));
    }

    #[test]
    fn test_placeholder_properties() {
        let mut dec = FakeVideoDecoder::new("v");
        let info = Structure::builder("resource-info").field("video-port", 1).build();

        assert!(dec.has_property(PROP_RESOURCE_INFO));
        dec.set_property(PROP_RESOURCE_INFO, info.clone().into()).unwrap();
        assert_eq!(dec.property(PROP_RESOURCE_INFO), Some(Value::from(info)));

        assert!(matches!(
            dec.set_property(PROP_ACTIVE_MODE, Value::from("yes")),
            Err(Error::InvalidPropertyValue(_))
        ));
        assert!(matches!(
            dec.set_property("input-buffers", Value::from(4)),
            Err(Error::UnknownProperty { .. })
        ));
    }
}
