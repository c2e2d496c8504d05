//! # decproxy
//!
//! Decoder proxy elements for a media pipeline.
//!
//! A proxy sits where a decoder would and decides at runtime which decoder
//! actually processes the stream. Until a downstream resource manager
//! grants hardware, a cheap placeholder keeps the pipeline's topology and
//! timing intact; once granted, the proxy resolves the best real decoder
//! from a ranked registry and swaps it in without dropping, duplicating or
//! reordering a single buffer. Revoking the grant swaps back.
//!
//! ## Features
//!
//! - **Stream classification**: audio/video/text by media type, with
//!   media-info records posted to the application
//! - **Ranked resolution**: highest-ranked matching decoder, never the
//!   proxy itself
//! - **Lossless hot swap**: block, drain, replace, unblock
//! - **Deferred activation**: grants that arrive before caps are kept
//! - **Configuration**: rank overrides and decoder buffering from TOML
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use decproxy::prelude::*;
//!
//! let registry = Arc::new(FactoryRegistry::new());
//! let bus = Bus::default();
//! decproxy::plugin_init(&registry, &bus, &CoolConfig::default()).unwrap();
//!
//! let node = ProxyNode::builder(registry).name("decproxy0").bus(bus).build();
//! let out = Arc::new(ItemCollector::new());
//! node.link(out.clone());
//! node.set_state(ElementState::Playing).unwrap();
//!
//! node.sink_event(Event::Caps(Caps::new_simple("audio/x-ac3"))).unwrap();
//! node.handle_activation(ActivationRequest::new(true)).unwrap();
//! // No AC-3 decoder is registered: the audio placeholder stays, marking
//! // the stream unsupported.
//! assert_eq!(node.state(), ProxyState::PlaceholderActive);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod bus;
pub mod config;
pub mod decproxy;
pub mod element;
pub mod elements;
pub mod error;
pub mod event;
pub mod format;
pub mod metadata;
pub mod observability;
pub mod registry;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::buffer::Buffer;
    pub use crate::bus::{Bus, Message, StreamErrorKind};
    pub use crate::config::{CoolConfig, DecodeConfig};
    pub use crate::decproxy::{ActivationRequest, ProxyNode, ProxyState, StreamType};
    pub use crate::element::{DecoderElement, ElementState, Output, PadTarget};
    pub use crate::elements::ItemCollector;
    pub use crate::error::{Error, Result};
    pub use crate::event::{Event, PipelineItem};
    pub use crate::format::{Caps, Structure, Value};
    pub use crate::metadata::Metadata;
    pub use crate::registry::{ElementFactory, FactoryRegistry, Rank};
}

pub use error::{Error, Result};

use std::sync::Arc;

/// Register the placeholder decoders and the proxy factories, then apply
/// the configured rank overrides.
pub fn plugin_init(
    registry: &Arc<registry::FactoryRegistry>,
    bus: &bus::Bus,
    config: &config::CoolConfig,
) -> Result<()> {
    config.validate()?;
    observability::init_metrics();
    elements::register_builtin(registry);
    decproxy::register(registry, bus, config.decode);
    let applied = config.apply_ranks(registry);
    tracing::info!(
        factories = registry.list_factories().len(),
        rank_overrides = applied,
        "plugin initialized"
    );
    Ok(())
}
