//! Decoder resolution against the factory registry.

use crate::error::{Error, Result};
use crate::format::Caps;
use crate::registry::{ElementFactory, FactoryRegistry, Rank};
use std::fmt;
use std::sync::Arc;

/// Lowest rank a factory needs to be considered.
pub const MIN_DECODER_RANK: Rank = Rank::MARGINAL;

/// A decoder chosen for a stream.
#[derive(Clone)]
pub struct DecoderCandidate {
    /// Factory to instantiate.
    pub factory: Arc<dyn ElementFactory>,
    /// Effective rank at resolution time.
    pub rank: Rank,
    /// Caps the factory accepts.
    pub caps: Caps,
}

impl DecoderCandidate {
    /// Factory name.
    pub fn name(&self) -> &str {
        self.factory.name()
    }
}

impl fmt::Debug for DecoderCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderCandidate")
            .field("name", &self.factory.name())
            .field("rank", &self.rank)
            .finish()
    }
}

/// Pick the best decoder for `caps`.
///
/// Decoders at or above [`MIN_DECODER_RANK`] are ordered by rank
/// (highest first, ties by factory name), filtered to those whose sink
/// caps intersect `caps`, and the first is taken. If that one is
/// `self_identity` the runner-up is taken instead.
pub fn resolve(
    registry: &FactoryRegistry,
    caps: &Caps,
    self_identity: Option<&str>,
) -> Result<DecoderCandidate> {
    resolve_with_min_rank(registry, caps, self_identity, MIN_DECODER_RANK)
}

/// [`resolve`] with an explicit rank floor.
pub fn resolve_with_min_rank(
    registry: &FactoryRegistry,
    caps: &Caps,
    self_identity: Option<&str>,
    min_rank: Rank,
) -> Result<DecoderCandidate> {
    let mut decoders = registry.list_decoders(min_rank);
    if decoders.is_empty() {
        tracing::warn!("cannot find any decoders");
        return Err(Error::NoDecodersRegistered);
    }

    decoders.sort_by(|a, b| b.rank.cmp(&a.rank).then_with(|| a.name().cmp(b.name())));

    let filtered: Vec<_> = decoders
        .into_iter()
        .filter(|e| e.factory.matches(caps))
        .collect();
    tracing::debug!(
        %caps,
        candidates = ?filtered.iter().map(|e| e.name()).collect::<Vec<_>>(),
        "filtered decoder list"
    );

    let mut iter = filtered.into_iter();
    let first = iter.next().ok_or_else(|| {
        tracing::warn!(%caps, "cannot find any decoder for caps");
        Error::NoMatchingDecoder
    })?;

    // A proxy must never pick itself as its own child.
    let chosen = if Some(first.name()) == self_identity {
        iter.next().ok_or(Error::NoMatchingDecoder)?
    } else {
        first
    };

    Ok(DecoderCandidate {
        caps: chosen.factory.sink_caps(),
        factory: chosen.factory,
        rank: chosen.rank,
    })
}
