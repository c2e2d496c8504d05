//! Element running states.

use std::fmt;

/// Running state of an element.
///
/// States are ordered: `Null < Ready < Paused < Playing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ElementState {
    /// Initial state; no resources held.
    #[default]
    Null,
    /// Resources allocated, not processing.
    Ready,
    /// Accepting data, clock not running.
    Paused,
    /// Processing data.
    Playing,
}

impl ElementState {
    /// Whether the element accepts data in this state.
    pub fn is_running(&self) -> bool {
        matches!(self, ElementState::Paused | ElementState::Playing)
    }

    /// Get the state name.
    pub fn name(&self) -> &'static str {
        match self {
            ElementState::Null => "null",
            ElementState::Ready => "ready",
            ElementState::Paused => "paused",
            ElementState::Playing => "playing",
        }
    }
}

impl fmt::Display for ElementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
