//! Tag lists carried by tag events.
//!
//! Tags are container-level metadata about a stream (codec names, language,
//! bitrates, ...). Unlike caps they do not take part in negotiation, so they
//! are only surfaced to the application.
//!
//! # Example
//!
//! ```rust
//! use decproxy::event::TagList;
//!
//! let mut tags = TagList::new();
//! tags.set("language-code", "ko");
//! tags.set("bitrate", 1_500_000u64);
//!
//! assert_eq!(tags.get_string("language-code"), Some("ko"));
//! assert_eq!(tags.bitrate(), Some(1_500_000));
//! ```

use crate::format::Value;

// ============================================================================
// Tag List
// ============================================================================

/// An ordered collection of stream tags.
///
/// Insertion order is kept so that anything derived from a tag list is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagList {
    tags: Vec<(String, Value)>,
}

impl TagList {
    /// Create a new empty tag list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a tag value, replacing an existing one in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.tags.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.tags.push((key, value)),
        }
    }

    /// Get a tag value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.tags.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Get a tag as a string.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Get a tag as a u64.
    pub fn get_uint(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_uint)
    }

    /// Remove a tag.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.tags.iter().position(|(k, _)| k == key)?;
        Some(self.tags.remove(idx).1)
    }

    /// Check if a tag exists.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Get the number of tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterate over all tags in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge another tag list into this one.
    pub fn merge(&mut self, other: &TagList, mode: TagMergeMode) {
        match mode {
            TagMergeMode::Replace => {
                self.tags = other.tags.clone();
            }
            TagMergeMode::Append => {
                for (k, v) in other.iter() {
                    self.set(k, v.clone());
                }
            }
            TagMergeMode::Keep => {
                for (k, v) in other.iter() {
                    if !self.contains(k) {
                        self.set(k, v.clone());
                    }
                }
            }
        }
    }

    /// Get the bitrate tag (bits per second).
    pub fn bitrate(&self) -> Option<u64> {
        self.get_uint(tag_names::BITRATE)
    }

    /// Get the video codec tag.
    pub fn video_codec(&self) -> Option<&str> {
        self.get_string(tag_names::VIDEO_CODEC)
    }

    /// Get the audio codec tag.
    pub fn audio_codec(&self) -> Option<&str> {
        self.get_string(tag_names::AUDIO_CODEC)
    }

    /// Get the language code tag.
    pub fn language_code(&self) -> Option<&str> {
        self.get_string(tag_names::LANGUAGE_CODE)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for TagList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = TagList::new();
        for (k, v) in iter {
            tags.set(k, v);
        }
        tags
    }
}

// ============================================================================
// Tag Merge Mode
// ============================================================================

/// How to merge tag lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TagMergeMode {
    /// Replace all existing tags with new ones.
    Replace,
    /// Add new tags, replace existing ones with same key.
    #[default]
    Append,
    /// Add new tags, keep existing ones if key exists.
    Keep,
}

// ============================================================================
// Common Tag Constants
// ============================================================================

/// Common tag names.
pub mod tag_names {
    /// Bitrate in bits/second.
    pub const BITRATE: &str = "bitrate";
    /// Nominal bitrate.
    pub const NOMINAL_BITRATE: &str = "nominal-bitrate";
    /// Minimum bitrate.
    pub const MINIMUM_BITRATE: &str = "minimum-bitrate";
    /// Maximum bitrate.
    pub const MAXIMUM_BITRATE: &str = "maximum-bitrate";
    /// Video codec name.
    pub const VIDEO_CODEC: &str = "video-codec";
    /// Audio codec name.
    pub const AUDIO_CODEC: &str = "audio-codec";
    /// Subtitle codec name.
    pub const SUBTITLE_CODEC: &str = "subtitle-codec";
    /// Container format.
    pub const CONTAINER_FORMAT: &str = "container-format";
    /// Language (ISO 639 code).
    pub const LANGUAGE_CODE: &str = "language-code";
}
