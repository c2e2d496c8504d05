//! End-to-end scenarios for proxies created through the registry.
//!
//! These tests verify that:
//! - Media-info records reach the application once per caps
//! - Activation resolves a real decoder, never the proxy itself
//! - Early activation is applied as soon as the stream is classified
//! - Unsupported audio degrades to corrupted markers with a warning

use decproxy::buffer::Buffer;
use decproxy::bus::{Bus, Message, StreamErrorKind};
use decproxy::config::{CoolConfig, DecodeConfig};
use decproxy::decproxy::{
    ActivationRequest, DECPROXY, DecProxyFactory, ProxyKind, ProxyNode, ProxyState, StreamType,
    resolve, resolve_with_min_rank,
};
use decproxy::element::{DecoderElement, ElementState};
use decproxy::elements::{Identity, ItemCollector};
use decproxy::error::{Error, Result};
use decproxy::event::{Event, PipelineItem, StreamStartEvent};
use decproxy::format::{Caps, Value};
use decproxy::metadata::Metadata;
use decproxy::registry::{ElementFactory, FactoryRegistry, Rank};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Test decoder factory producing pass-through instances.
struct TestDecoderFactory {
    name: &'static str,
    rank: Rank,
    caps: &'static str,
    /// Last resource-info handed to an instance.
    handed: Arc<Mutex<Option<Value>>>,
    /// Last input-buffers handed to an instance.
    input_buffers: Arc<Mutex<Option<Value>>>,
    /// Last output-buffers handed to an instance.
    output_buffers: Arc<Mutex<Option<Value>>>,
}

impl TestDecoderFactory {
    fn new(name: &'static str, rank: u32, caps: &'static str) -> Self {
        Self {
            name,
            rank: Rank(rank),
            caps,
            handed: Arc::new(Mutex::new(None)),
            input_buffers: Arc::new(Mutex::new(None)),
            output_buffers: Arc::new(Mutex::new(None)),
        }
    }
}

/// A pass-through decoder that records the properties it is given.
struct TestDecoder {
    inner: Identity,
    handed: Arc<Mutex<Option<Value>>>,
    input_buffers: Arc<Mutex<Option<Value>>>,
    output_buffers: Arc<Mutex<Option<Value>>>,
}

impl DecoderElement for TestDecoder {
    fn name(&self) -> &str {
        self.inner.name()
    }
    fn factory_name(&self) -> &str {
        self.inner.factory_name()
    }
    fn chain(&mut self, buffer: Buffer) -> Result<decproxy::element::Output> {
        self.inner.chain(buffer)
    }
    fn sink_event(&mut self, event: Event) -> Result<decproxy::element::Output> {
        self.inner.sink_event(event)
    }
    fn set_state(&mut self, state: ElementState) -> Result<()> {
        self.inner.set_state(state)
    }
    fn state(&self) -> ElementState {
        self.inner.state()
    }
    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "resource-info" => *self.handed.lock().unwrap() = Some(value),
            "input-buffers" => *self.input_buffers.lock().unwrap() = Some(value),
            "output-buffers" => *self.output_buffers.lock().unwrap() = Some(value),
            _ => {
                return Err(Error::UnknownProperty {
                    element: self.name().to_string(),
                    property: name.to_string(),
                });
            }
        }
        Ok(())
    }
    fn property(&self, name: &str) -> Option<Value> {
        match name {
            "input-buffers" => self.input_buffers.lock().unwrap().clone(),
            "output-buffers" => self.output_buffers.lock().unwrap().clone(),
            _ => None,
        }
    }
    fn has_property(&self, name: &str) -> bool {
        matches!(name, "resource-info" | "input-buffers" | "output-buffers")
    }
}

impl ElementFactory for TestDecoderFactory {
    fn name(&self) -> &str {
        self.name
    }
    fn klass(&self) -> &str {
        "Codec/Decoder/Video"
    }
    fn rank(&self) -> Rank {
        self.rank
    }
    fn sink_caps(&self) -> Caps {
        Caps::from_names(self.caps)
    }
    fn create(&self, name: &str) -> Result<Box<dyn DecoderElement>> {
        Ok(Box::new(TestDecoder {
            inner: Identity::new().with_name(name).with_factory_name(self.name),
            handed: self.handed.clone(),
            input_buffers: self.input_buffers.clone(),
            output_buffers: self.output_buffers.clone(),
        }))
    }
}

fn create_registry(bus: &Bus) -> Arc<FactoryRegistry> {
    let registry = Arc::new(FactoryRegistry::new());
    decproxy::plugin_init(&registry, bus, &CoolConfig::default()).unwrap();
    registry
}

fn create_proxy(registry: &Arc<FactoryRegistry>, bus: &Bus) -> (ProxyNode, Arc<ItemCollector>) {
    let factory = DecProxyFactory::new(ProxyKind::Any, registry, bus.clone(), DecodeConfig::default());
    let node = factory.create_node("decproxy0").unwrap();
    let out = Arc::new(ItemCollector::new());
    node.link(out.clone());
    node.set_state(ElementState::Playing).unwrap();
    (node, out)
}

fn create_test_buffer(seq: u64) -> Buffer {
    let meta = Metadata::with_sequence(seq).with_pts(Duration::from_millis(seq * 40));
    Buffer::from_bytes(vec![seq as u8; 64], meta)
}

fn media_infos(messages: &[Message]) -> Vec<&decproxy::format::Structure> {
    messages
        .iter()
        .filter_map(|m| match m {
            Message::MediaInfo { record, .. } => Some(record),
            _ => None,
        })
        .collect()
}

#[test]
fn test_end_to_end_h264() {
    let bus = Bus::new(64);
    let registry = create_registry(&bus);
    // Same rank as the general proxy; the proxy sorts first by name and
    // must be skipped.
    registry.register(Arc::new(TestDecoderFactory::new("h264dec", 256, "video/x-h264")));
    let (node, out) = create_proxy(&registry, &bus);
    let mut rx = bus.subscribe();

    node.sink_event(Event::StreamStart(StreamStartEvent::new("s1")))
        .unwrap();
    node.sink_event(Event::Caps(Caps::new_simple("video/x-h264")))
        .unwrap();

    let messages = rx.drain();
    let infos = media_infos(&messages);
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].get_str("stream-id"), Some("s1"));
    assert_eq!(
        infos[0].get_int("type"),
        Some(i64::from(StreamType::Video.as_int()))
    );
    assert_eq!(infos[0].get_str("mime-type"), Some("video/x-h264"));
    assert_eq!(node.state(), ProxyState::PlaceholderActive);

    // Grant: the real decoder replaces the placeholder.
    assert!(node.send_upstream_event(ActivationRequest::new(true).into_event()).unwrap());
    assert_eq!(node.state(), ProxyState::DecoderActive);
    assert_eq!(node.current_factory().as_deref(), Some("h264dec"));

    out.take();
    for seq in 0..5 {
        node.chain(create_test_buffer(seq)).unwrap();
    }

    // Revoke: exactly one swap back, nothing lost.
    let before = node.swap_count();
    assert!(node.send_upstream_event(ActivationRequest::new(false).into_event()).unwrap());
    assert_eq!(node.swap_count(), before + 1);
    assert_eq!(node.state(), ProxyState::PlaceholderActive);
    assert_eq!(node.current_factory().as_deref(), Some("fakevdec"));

    let seqs: Vec<_> = out.buffers().iter().map(|b| b.metadata().sequence).collect();
    assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
    assert!(!out.items().iter().any(PipelineItem::is_eos));

    let states: Vec<_> = rx
        .drain()
        .into_iter()
        .filter_map(|m| match m {
            Message::StateChanged { to, .. } => Some(to),
            _ => None,
        })
        .collect();
    assert_eq!(states, vec![ProxyState::DecoderActive, ProxyState::PlaceholderActive]);
}

#[test]
fn test_deferred_activation_applied_on_first_caps() {
    let bus = Bus::new(64);
    let registry = create_registry(&bus);
    let factory = TestDecoderFactory::new("h264dec", 256, "video/x-h264");
    let handed = factory.handed.clone();
    registry.register(Arc::new(factory));
    let (node, _out) = create_proxy(&registry, &bus);

    node.handle_activation(ActivationRequest::new(true).with_port(StreamType::Video, 1))
        .unwrap();
    assert_eq!(node.state(), ProxyState::Unresolved);

    node.sink_event(Event::Caps(Caps::new_simple("video/x-h264")))
        .unwrap();
    assert_eq!(node.state(), ProxyState::DecoderActive);
    assert_eq!(node.swap_count(), 1);

    // The port reached the decoder.
    let handed = handed.lock().unwrap().clone().unwrap();
    let info = handed.as_structure().unwrap();
    assert_eq!(info.get_int("video-port"), Some(1));
    assert_eq!(info.get_bool("active"), Some(true));
}

#[test]
fn test_idempotent_activation() {
    let bus = Bus::default();
    let registry = create_registry(&bus);
    registry.register(Arc::new(TestDecoderFactory::new("h264dec", 256, "video/x-h264")));
    let (node, _out) = create_proxy(&registry, &bus);
    node.sink_event(Event::Caps(Caps::new_simple("video/x-h264")))
        .unwrap();

    node.handle_activation(ActivationRequest::new(true)).unwrap();
    node.handle_activation(ActivationRequest::new(true)).unwrap();
    assert_eq!(node.swap_count(), 1);

    node.handle_activation(ActivationRequest::new(false)).unwrap();
    node.handle_activation(ActivationRequest::new(false)).unwrap();
    assert_eq!(node.swap_count(), 2);
}

#[test]
fn test_resolver_self_exclusion() {
    let bus = Bus::default();
    let registry = create_registry(&bus);
    let h264 = Caps::new_simple("video/x-h264");

    // Only the proxy itself can take h264.
    assert!(matches!(
        resolve(&registry, &h264, Some(DECPROXY)),
        Err(Error::NoMatchingDecoder)
    ));
    assert_eq!(resolve(&registry, &h264, None).unwrap().name(), DECPROXY);
}

#[test]
fn test_resolver_ranking() {
    let registry = FactoryRegistry::new();
    for (name, rank) in [("dec10", 10), ("dec50", 50), ("dec30", 30)] {
        registry.register(Arc::new(TestDecoderFactory::new(name, rank, "video/x-h264")));
    }
    let h264 = Caps::new_simple("video/x-h264");
    let best = resolve_with_min_rank(&registry, &h264, None, Rank::NONE).unwrap();
    assert_eq!(best.name(), "dec50");
    assert_eq!(best.rank, Rank(50));

    // Below the default floor none of them count.
    assert!(matches!(
        resolve(&registry, &h264, None),
        Err(Error::NoDecodersRegistered)
    ));
}

#[test]
fn test_unsupported_audio_degrades() {
    let bus = Bus::new(64);
    let registry = create_registry(&bus);
    let (node, out) = create_proxy(&registry, &bus);
    let mut rx = bus.subscribe();

    node.sink_event(Event::Caps(Caps::new_simple("audio/x-ac3")))
        .unwrap();
    node.handle_activation(ActivationRequest::new(true)).unwrap();
    assert_eq!(node.state(), ProxyState::PlaceholderActive);
    assert_eq!(node.current_factory().as_deref(), Some("fakeadec"));

    let warned = rx.drain().into_iter().any(|m| {
        matches!(
            m,
            Message::Warning { kind: StreamErrorKind::CodecNotFound, ref text, .. }
                if text == "This audio is not supported by decoder"
        )
    });
    assert!(warned);

    // Buffers now come out as corrupted markers with timing kept.
    out.take();
    node.chain(create_test_buffer(3)).unwrap();
    let buffers = out.buffers();
    assert_eq!(buffers.len(), 1);
    assert!(buffers[0].is_empty());
    assert!(buffers[0].metadata().flags.is_corrupted());
    assert_eq!(buffers[0].metadata().pts, Some(Duration::from_millis(120)));

    // A normal-rate segment does not clear the marker mode.
    node.sink_event(Event::Segment(Default::default())).unwrap();
    out.take();
    node.chain(create_test_buffer(4)).unwrap();
    assert_eq!(out.buffers().len(), 1);

    // Revoking goes back to a plain placeholder producing gaps.
    node.handle_activation(ActivationRequest::new(false)).unwrap();
    out.take();
    node.chain(create_test_buffer(5)).unwrap();
    assert!(out.buffers().is_empty());
    assert!(out.events().iter().any(|e| matches!(e, Event::Gap(_))));
}

#[test]
fn test_trick_mode_toggles_placeholder() {
    let bus = Bus::default();
    let registry = create_registry(&bus);
    let (node, out) = create_proxy(&registry, &bus);
    node.sink_event(Event::Caps(Caps::new_simple("audio/mpeg")))
        .unwrap();

    node.sink_event(Event::Segment(
        decproxy::event::SegmentEvent::default().with_rate(-1.0),
    ))
    .unwrap();
    out.take();
    node.chain(create_test_buffer(1)).unwrap();
    assert_eq!(out.buffers().len(), 1, "trick play forwards markers");

    node.sink_event(Event::Segment(Default::default())).unwrap();
    out.take();
    node.chain(create_test_buffer(2)).unwrap();
    assert!(out.buffers().is_empty(), "normal play turns buffers into gaps");
}

#[test]
fn test_decoder_buffering_from_config() {
    let bus = Bus::default();
    let registry = create_registry(&bus);
    let decoder = TestDecoderFactory::new("h264dec", 256, "video/x-h264");
    let input_buffers = decoder.input_buffers.clone();
    let output_buffers = decoder.output_buffers.clone();
    registry.register(Arc::new(decoder));
    let factory = DecProxyFactory::new(
        ProxyKind::Any,
        &registry,
        bus.clone(),
        DecodeConfig {
            in_size: Some(8),
            out_size: Some(4),
        },
    );
    let node = factory.create_node("dec0").unwrap();
    node.link(Arc::new(ItemCollector::new()));
    node.set_state(ElementState::Playing).unwrap();
    node.sink_event(Event::Caps(Caps::new_simple("video/x-h264")))
        .unwrap();
    node.handle_activation(ActivationRequest::new(true)).unwrap();
    assert_eq!(node.current_factory().as_deref(), Some("h264dec"));
    assert_eq!(*input_buffers.lock().unwrap(), Some(Value::UInt(8)));
    assert_eq!(*output_buffers.lock().unwrap(), Some(Value::UInt(4)));
}

#[test]
fn test_restart_after_null() {
    let bus = Bus::default();
    let registry = create_registry(&bus);
    registry.register(Arc::new(TestDecoderFactory::new("h264dec", 256, "video/x-h264")));
    let (node, out) = create_proxy(&registry, &bus);
    node.sink_event(Event::Caps(Caps::new_simple("video/x-h264")))
        .unwrap();
    node.handle_activation(ActivationRequest::new(true)).unwrap();

    node.set_state(ElementState::Null).unwrap();
    assert_eq!(node.state(), ProxyState::Unresolved);

    node.set_state(ElementState::Playing).unwrap();
    out.take();
    node.sink_event(Event::Caps(Caps::new_simple("audio/mpeg")))
        .unwrap();
    assert_eq!(node.stream_type(), Some(StreamType::Audio));
    assert_eq!(node.state(), ProxyState::PlaceholderActive);
    // The earlier grant does not carry over into the new stream.
    assert!(!node.target_active());
}
