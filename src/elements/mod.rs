//! Built-in elements.
//!
//! ## Stages
//! - [`Identity`]: Pass-through with counters; front/back stage of a proxy
//!
//! ## Placeholder decoders
//! - [`FakeAudioDecoder`] (`fakeadec`): turns compressed audio into gaps
//! - [`FakeVideoDecoder`] (`fakevdec`): discards compressed video
//!
//! ## Sinks
//! - [`ItemCollector`]: Records everything pushed into it

mod collect;
mod fakedec;
mod identity;

pub use collect::ItemCollector;
pub use fakedec::{
    FakeAudioDecoder, FakeAudioDecoderFactory, FakeVideoDecoder, FakeVideoDecoderFactory,
    PROP_ACTIVE_MODE, PROP_RESOURCE_INFO,
};
pub use identity::{Identity, IdentityStats, ItemCallback};

use crate::registry::FactoryRegistry;
use std::sync::Arc;

/// Register the placeholder decoder factories.
pub fn register_builtin(registry: &FactoryRegistry) {
    registry.register(Arc::new(FakeAudioDecoderFactory));
    registry.register(Arc::new(FakeVideoDecoderFactory));
}
