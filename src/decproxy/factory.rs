//! Factories that make proxies available through the registry.
//!
//! Three variants are registered: `decproxy` takes any supported video
//! or audio format at primary rank, while `vdecproxy` and `adecproxy`
//! each accept one media family and are only created by name.

use super::node::ProxyNode;
use crate::buffer::Buffer;
use crate::bus::Bus;
use crate::config::DecodeConfig;
use crate::element::{DecoderElement, ElementState, Output};
use crate::elements::ItemCollector;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::format::Caps;
use crate::registry::{ElementFactory, FactoryRegistry, Rank};
use std::sync::{Arc, Weak};

/// Factory name of the general proxy.
pub const DECPROXY: &str = "decproxy";
/// Factory name of the video-only proxy.
pub const VDECPROXY: &str = "vdecproxy";
/// Factory name of the audio-only proxy.
pub const ADECPROXY: &str = "adecproxy";

/// Compressed video formats a proxy accepts.
pub const DECODE_VIDEO_CAPS: &[&str] = &[
    "video/x-divx",
    "video/x-h265",
    "video/x-h264",
    "video/x-intel-h263",
    "video/x-h263",
    "video/mpeg",
    "video/x-wmv",
    "video/x-msmpeg",
    "video/x-pn-realvideo",
    "video/x-svq",
    "video/x-ffv",
    "video/x-3ivx",
    "video/x-vp8",
    "video/x-vp9",
    "video/x-xvid",
    "video/x-flash-video",
    "image/jpeg",
];

/// Compressed audio formats a proxy accepts.
pub const DECODE_AUDIO_CAPS: &[&str] = &[
    "audio/mpeg",
    "audio/x-dts",
    "audio/x-dtsh",
    "audio/x-dtsl",
    "audio/x-dtse",
    "audio/x-ac3",
    "audio/x-eac3",
    "audio/x-private1-ac3",
    "audio/x-wma",
    "audio/x-pn-realaudio",
    "audio/x-lpcm-1",
    "audio/x-lpcm",
    "audio/x-private-lg-lpcm",
    "audio/x-private1-lpcm",
    "audio/x-private-ts-lpcm",
    "audio/x-adpcm",
    "audio/x-vorbis",
    "audio/AMR",
    "audio/AMR-WB",
    "audio/x-flac",
    "audio/x-mulaw",
    "audio/x-alaw",
    "audio/x-private1-dts",
];

/// Which formats a proxy factory accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    /// Video and audio.
    Any,
    /// Video only.
    Video,
    /// Audio only.
    Audio,
}

impl ProxyKind {
    /// Registered factory name.
    pub fn factory_name(self) -> &'static str {
        match self {
            ProxyKind::Any => DECPROXY,
            ProxyKind::Video => VDECPROXY,
            ProxyKind::Audio => ADECPROXY,
        }
    }

    fn klass(self) -> &'static str {
        match self {
            ProxyKind::Any => "Codec/Decoder/Bin",
            ProxyKind::Video => "Codec/Decoder/Video/Bin",
            ProxyKind::Audio => "Codec/Decoder/Audio/Bin",
        }
    }

    fn rank(self) -> Rank {
        match self {
            ProxyKind::Any => Rank::PRIMARY,
            ProxyKind::Video | ProxyKind::Audio => Rank::NONE,
        }
    }

    fn sink_caps(self) -> Caps {
        let names = match self {
            ProxyKind::Any => [DECODE_VIDEO_CAPS, DECODE_AUDIO_CAPS].concat(),
            ProxyKind::Video => DECODE_VIDEO_CAPS.to_vec(),
            ProxyKind::Audio => DECODE_AUDIO_CAPS.to_vec(),
        };
        Caps::from_names(&names.join(";"))
    }
}

/// Creates proxy elements.
///
/// Holds the registry weakly: the registry owns its factories, and a
/// proxy created after the registry is gone has nothing to resolve
/// against.
pub struct DecProxyFactory {
    kind: ProxyKind,
    registry: Weak<FactoryRegistry>,
    bus: Bus,
    decode: DecodeConfig,
}

impl DecProxyFactory {
    /// Create a factory resolving decoders from `registry`.
    pub fn new(kind: ProxyKind, registry: &Arc<FactoryRegistry>, bus: Bus, decode: DecodeConfig) -> Self {
        Self {
            kind,
            registry: Arc::downgrade(registry),
            bus,
            decode,
        }
    }

    /// Accepted formats.
    pub fn kind(&self) -> ProxyKind {
        self.kind
    }

    /// Build a bare node, for callers that drive it directly.
    pub fn create_node(&self, name: &str) -> Result<ProxyNode> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| Error::Element(format!("{}: registry is gone", self.kind.factory_name())))?;
        Ok(ProxyNode::builder(registry)
            .name(name)
            .self_factory(self.kind.factory_name())
            .bus(self.bus.clone())
            .decode_config(self.decode)
            .build())
    }
}

impl ElementFactory for DecProxyFactory {
    fn name(&self) -> &str {
        self.kind.factory_name()
    }

    fn klass(&self) -> &str {
        self.kind.klass()
    }

    fn rank(&self) -> Rank {
        self.kind.rank()
    }

    fn sink_caps(&self) -> Caps {
        self.kind.sink_caps()
    }

    fn create(&self, name: &str) -> Result<Box<dyn DecoderElement>> {
        let node = Arc::new(self.create_node(name)?);
        Ok(Box::new(ProxyElement::new(node, self.kind.factory_name())))
    }
}

/// A proxy node seen as a plain decoder element.
///
/// Output is collected internally and returned from each call, so a
/// proxy can itself be linked wherever a decoder can.
pub struct ProxyElement {
    node: Arc<ProxyNode>,
    output: Arc<ItemCollector>,
    factory: &'static str,
}

impl ProxyElement {
    fn new(node: Arc<ProxyNode>, factory: &'static str) -> Self {
        let output = Arc::new(ItemCollector::new());
        node.link(output.clone());
        Self { node, output, factory }
    }

    /// The wrapped node.
    pub fn node(&self) -> &Arc<ProxyNode> {
        &self.node
    }

    fn collected(&self) -> Output {
        self.output.take().into()
    }
}

impl DecoderElement for ProxyElement {
    fn name(&self) -> &str {
        self.node.name()
    }

    fn factory_name(&self) -> &str {
        self.factory
    }

    fn chain(&mut self, buffer: Buffer) -> Result<Output> {
        self.node.chain(buffer)?;
        Ok(self.collected())
    }

    fn sink_event(&mut self, event: Event) -> Result<Output> {
        self.node.sink_event(event)?;
        Ok(self.collected())
    }

    fn src_event(&mut self, event: Event) -> Result<bool> {
        self.node.send_upstream_event(event)
    }

    fn set_state(&mut self, state: ElementState) -> Result<()> {
        self.node.set_state(state)
    }

    fn state(&self) -> ElementState {
        self.node.element_state()
    }
}

/// Register the three proxy factories.
pub fn register(registry: &Arc<FactoryRegistry>, bus: &Bus, decode: DecodeConfig) {
    for kind in [ProxyKind::Any, ProxyKind::Video, ProxyKind::Audio] {
        registry.register(Arc::new(DecProxyFactory::new(kind, registry, bus.clone(), decode)));
    }
    tracing::debug!("proxy factories registered");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decproxy::{ActivationRequest, ProxyState};
    use crate::elements::register_builtin;

    fn registry() -> Arc<FactoryRegistry> {
        let registry = Arc::new(FactoryRegistry::new());
        register_builtin(&registry);
        register(&registry, &Bus::default(), DecodeConfig::default());
        registry
    }

    #[test]
    fn test_variants_registered() {
        let registry = registry();
        for name in [DECPROXY, VDECPROXY, ADECPROXY] {
            assert!(registry.has_factory(name));
        }
        let general = registry.find(DECPROXY).unwrap();
        assert_eq!(general.rank(), Rank::PRIMARY);
        assert_eq!(general.klass(), "Codec/Decoder/Bin");
        assert_eq!(registry.find(VDECPROXY).unwrap().rank(), Rank::NONE);
    }

    #[test]
    fn test_caps_families() {
        let registry = registry();
        let h264 = Caps::new_simple("video/x-h264");
        let ac3 = Caps::new_simple("audio/x-ac3");
        assert!(registry.find(DECPROXY).unwrap().matches(&h264));
        assert!(registry.find(DECPROXY).unwrap().matches(&ac3));
        assert!(registry.find(VDECPROXY).unwrap().matches(&h264));
        assert!(!registry.find(VDECPROXY).unwrap().matches(&ac3));
        assert!(registry.find(ADECPROXY).unwrap().matches(&ac3));
        assert!(!registry.find(DECPROXY).unwrap().matches(&Caps::new_simple("video/x-raw")));
    }

    struct H264DecoderFactory;

    impl ElementFactory for H264DecoderFactory {
        fn name(&self) -> &str {
            "h264dec"
        }
        fn klass(&self) -> &str {
            "Codec/Decoder/Video"
        }
        fn rank(&self) -> Rank {
            Rank::PRIMARY
        }
        fn sink_caps(&self) -> Caps {
            Caps::new_simple("video/x-h264")
        }
        fn create(&self, name: &str) -> Result<Box<dyn DecoderElement>> {
            Ok(Box::new(
                crate::elements::Identity::new()
                    .with_name(name)
                    .with_factory_name("h264dec"),
            ))
        }
    }

    #[test]
    fn test_proxy_never_resolves_to_itself() {
        // Only the video proxy and a real decoder, with the proxy ranked
        // above the decoder by an override.
        let registry = Arc::new(FactoryRegistry::new());
        register_builtin(&registry);
        registry.register(Arc::new(DecProxyFactory::new(
            ProxyKind::Video,
            &registry,
            Bus::default(),
            DecodeConfig::default(),
        )));
        registry.register(Arc::new(H264DecoderFactory));
        registry.set_rank(VDECPROXY, Rank(512));

        let mut element = registry.make(VDECPROXY).unwrap();
        element.set_state(ElementState::Playing).unwrap();
        let out = element.sink_event(Event::Caps(Caps::new_simple("video/x-h264"))).unwrap();
        assert!(!out.is_empty());

        assert!(element.src_event(ActivationRequest::new(true).into_event()).unwrap());
        assert_eq!(element.factory_name(), VDECPROXY);

        let factory = DecProxyFactory::new(ProxyKind::Video, &registry, Bus::default(), DecodeConfig::default());
        let node = Arc::new(factory.create_node("vdec1").unwrap());
        let mut element = ProxyElement::new(node.clone(), VDECPROXY);
        element.set_state(ElementState::Playing).unwrap();
        element.sink_event(Event::Caps(Caps::new_simple("video/x-h264"))).unwrap();
        node.handle_activation(ActivationRequest::new(true)).unwrap();
        assert_eq!(node.state(), ProxyState::DecoderActive);
        assert_eq!(node.current_factory().as_deref(), Some("h264dec"));
    }

    #[test]
    fn test_proxy_alone_keeps_placeholder() {
        let registry = registry();
        let factory = DecProxyFactory::new(ProxyKind::Any, &registry, Bus::default(), DecodeConfig::default());
        let node = Arc::new(factory.create_node("dec0").unwrap());
        let mut element = ProxyElement::new(node.clone(), DECPROXY);
        element.set_state(ElementState::Playing).unwrap();
        element.sink_event(Event::Caps(Caps::new_simple("video/x-h264"))).unwrap();

        // The general proxy is the only usable match, and it is the node
        // itself.
        node.handle_activation(ActivationRequest::new(true)).unwrap();
        assert_eq!(node.state(), ProxyState::PlaceholderActive);
        assert_eq!(node.current_factory().as_deref(), Some("fakevdec"));
    }

    #[test]
    fn test_proxy_element_returns_output() {
        let registry = registry();
        let mut element = registry.make(ADECPROXY).unwrap();
        element.set_state(ElementState::Playing).unwrap();
        let out = element.sink_event(Event::Caps(Caps::new_simple("audio/x-ac3"))).unwrap();
        // stream-start, proxy caps, placeholder caps
        assert_eq!(out.len(), 3);
        assert_eq!(element.state(), ElementState::Playing);
    }

    #[test]
    fn test_create_after_registry_dropped() {
        let registry = Arc::new(FactoryRegistry::new());
        let factory = DecProxyFactory::new(ProxyKind::Any, &registry, Bus::default(), DecodeConfig::default());
        drop(registry);
        assert!(matches!(factory.create("p"), Err(Error::Element(_))));
    }

    #[test]
    fn test_element_exposes_node() {
        let registry = registry();
        let factory = DecProxyFactory::new(ProxyKind::Audio, &registry, Bus::default(), DecodeConfig::default());
        let node = factory.create_node("adec0").unwrap();
        assert_eq!(node.name(), "adec0");
        assert_eq!(node.state(), ProxyState::Unresolved);
    }
}
