//! Element factory registry.
//!
//! The registry is the capability database decoders are resolved from:
//! every factory advertises a classification string, a rank and the caps
//! its sink accepts.

use crate::element::DecoderElement;
use crate::error::{Error, Result};
use crate::format::Caps;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

// ============================================================================
// Rank
// ============================================================================

/// How strongly a factory should be preferred during auto-selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Rank(pub u32);

impl Rank {
    /// Never auto-selected.
    pub const NONE: Rank = Rank(0);
    /// Usable, but only if nothing better exists.
    pub const MARGINAL: Rank = Rank(64);
    /// Fallback choice.
    pub const SECONDARY: Rank = Rank(128);
    /// Preferred choice.
    pub const PRIMARY: Rank = Rank(256);
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Rank {
    fn from(v: u32) -> Self {
        Rank(v)
    }
}

// ============================================================================
// Element Factory
// ============================================================================

/// Creates decoder instances of one kind.
pub trait ElementFactory: Send + Sync {
    /// Unique factory name, e.g. `"fakeadec"`.
    fn name(&self) -> &str;

    /// Classification, e.g. `"Codec/Decoder/Video"`.
    fn klass(&self) -> &str;

    /// Default rank.
    fn rank(&self) -> Rank;

    /// Caps accepted on the sink side.
    fn sink_caps(&self) -> Caps;

    /// Whether this factory can take `caps` as input.
    fn matches(&self, caps: &Caps) -> bool {
        self.sink_caps().can_intersect(caps)
    }

    /// Create a new instance with the given instance name.
    fn create(&self, name: &str) -> Result<Box<dyn DecoderElement>>;
}

/// A registered factory together with its effective rank.
#[derive(Clone)]
pub struct FactoryEntry {
    /// The factory.
    pub factory: Arc<dyn ElementFactory>,
    /// Rank after configuration overrides.
    pub rank: Rank,
}

impl FactoryEntry {
    /// Factory name.
    pub fn name(&self) -> &str {
        self.factory.name()
    }
}

impl fmt::Debug for FactoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryEntry")
            .field("name", &self.factory.name())
            .field("klass", &self.factory.klass())
            .field("rank", &self.rank)
            .finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Registry of element factories.
///
/// The registry provides a central place to:
/// - Register factories
/// - Query decoders by rank
/// - Create element instances by factory name
pub struct FactoryRegistry {
    factories: RwLock<Vec<Arc<dyn ElementFactory>>>,
    rank_overrides: RwLock<HashMap<String, Rank>>,
    instance_counter: AtomicU64,
}

impl FactoryRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(Vec::new()),
            rank_overrides: RwLock::new(HashMap::new()),
            instance_counter: AtomicU64::new(0),
        }
    }

    /// Register a factory. A factory with the same name is replaced.
    pub fn register(&self, factory: Arc<dyn ElementFactory>) {
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        factories.retain(|f| f.name() != factory.name());
        tracing::debug!(factory = factory.name(), rank = %factory.rank(), "registered factory");
        factories.push(factory);
    }

    /// Find a factory by name.
    pub fn find(&self, name: &str) -> Option<Arc<dyn ElementFactory>> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|f| f.name() == name)
            .cloned()
    }

    /// Check if a factory is registered.
    pub fn has_factory(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Names of all registered factories, in registration order.
    pub fn list_factories(&self) -> Vec<String> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }

    /// Effective rank of a factory, honoring overrides.
    pub fn rank_of(&self, factory: &dyn ElementFactory) -> Rank {
        self.rank_overrides
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(factory.name())
            .copied()
            .unwrap_or_else(|| factory.rank())
    }

    /// Override the rank of a factory (configuration).
    pub fn set_rank(&self, name: impl Into<String>, rank: Rank) {
        let name = name.into();
        tracing::debug!(factory = %name, %rank, "rank override");
        self.rank_overrides
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, rank);
    }

    /// All decoder factories with an effective rank of at least `min_rank`.
    ///
    /// Decoders are factories whose klass contains `Decoder`. The result
    /// keeps registration order.
    pub fn list_decoders(&self, min_rank: Rank) -> Vec<FactoryEntry> {
        let factories = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        factories
            .iter()
            .filter(|f| f.klass().contains("Decoder"))
            .map(|f| FactoryEntry {
                factory: f.clone(),
                rank: self.rank_of(f.as_ref()),
            })
            .filter(|e| e.rank >= min_rank)
            .collect()
    }

    /// Create an element from a named factory.
    pub fn make(&self, factory_name: &str) -> Result<Box<dyn DecoderElement>> {
        let factory = self
            .find(factory_name)
            .ok_or_else(|| Error::FactoryNotFound(factory_name.to_string()))?;
        self.make_from(factory.as_ref())
    }

    /// Create an element from a factory handle, with a unique instance name.
    pub fn make_from(&self, factory: &dyn ElementFactory) -> Result<Box<dyn DecoderElement>> {
        let n = self.instance_counter.fetch_add(1, Ordering::Relaxed);
        factory.create(&format!("{}{}", factory.name(), n))
    }
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let factories = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("FactoryRegistry")
            .field("factories", &factories.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::register_builtin;

    #[test]
    fn test_registry_creation() {
        let registry = FactoryRegistry::new();
        assert!(registry.list_factories().is_empty());
        assert!(registry.list_decoders(Rank::NONE).is_empty());
    }

    #[test]
    fn test_make_not_found() {
        let registry = FactoryRegistry::new();
        assert!(matches!(
            registry.make("nonexistent"),
            Err(Error::FactoryNotFound(_))
        ));
    }

    #[test]
    fn test_list_decoders_filters_rank() {
        let registry = FactoryRegistry::new();
        register_builtin(&registry);

        // Placeholders register with rank NONE.
        assert!(registry.list_decoders(Rank::MARGINAL).is_empty());
        assert_eq!(registry.list_decoders(Rank::NONE).len(), 2);

        registry.set_rank("fakevdec", Rank::SECONDARY);
        let decoders = registry.list_decoders(Rank::MARGINAL);
        assert_eq!(decoders.len(), 1);
        assert_eq!(decoders[0].name(), "fakevdec");
        assert_eq!(decoders[0].rank, Rank::SECONDARY);
    }

    #[test]
    fn test_make_assigns_unique_names() {
        let registry = FactoryRegistry::new();
        register_builtin(&registry);

        let a = registry.make("fakeadec").unwrap();
        let b = registry.make("fakeadec").unwrap();
        assert_ne!(a.name(), b.name());
        assert_eq!(a.factory_name(), "fakeadec");
    }
}
