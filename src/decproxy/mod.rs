//! The decoder proxy.
//!
//! - [`classify`](classify()) sorts a stream into audio, video or text by media type.
//! - [`resolve`] picks the best registered decoder for a format.
//! - [`ProxyNode`] links a placeholder or a real decoder and swaps them
//!   on [`ActivationRequest`]s without losing data.
//! - [`register`] makes the proxy factories available in a registry.
//!
//! Media-info records for the application are built by [`to_metadata`]
//! and [`tags_to_metadata`].

mod activation;
mod classify;
mod factory;
mod mediainfo;
mod node;
mod resolver;

pub use activation::{ACQUIRED_RESOURCE, ActivationRequest, ResourceInfo};
pub use classify::{StreamType, classify, classify_name};
pub use factory::{
    ADECPROXY, DECODE_AUDIO_CAPS, DECODE_VIDEO_CAPS, DECPROXY, DecProxyFactory, ProxyElement,
    ProxyKind, VDECPROXY, register,
};
pub use mediainfo::{MEDIA_INFO, tags_to_metadata, to_metadata};
pub use node::{PROP_INPUT_BUFFERS, PROP_OUTPUT_BUFFERS, ProxyNode, ProxyNodeBuilder, ProxyState};
pub use resolver::{DecoderCandidate, MIN_DECODER_RANK, resolve, resolve_with_min_rank};
