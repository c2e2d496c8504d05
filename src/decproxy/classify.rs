//! Stream classification by media type.

use crate::format::Caps;
use std::fmt;

/// Broad category of an elementary stream.
///
/// The integer form (`as_int`) is what media-info records carry in their
/// `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    /// Compressed or raw audio.
    Audio,
    /// Compressed video or still images.
    Video,
    /// Subtitles and other text-like streams.
    Text,
    /// Anything else.
    Unknown,
}

impl StreamType {
    /// Integer code used in media-info records.
    pub fn as_int(self) -> i32 {
        match self {
            StreamType::Unknown => -1,
            StreamType::Audio => 0,
            StreamType::Video => 1,
            StreamType::Text => 2,
        }
    }

    /// Inverse of [`as_int`](Self::as_int).
    pub fn from_int(v: i64) -> Self {
        match v {
            0 => StreamType::Audio,
            1 => StreamType::Video,
            2 => StreamType::Text,
            _ => StreamType::Unknown,
        }
    }

    /// Lower-case name, also the prefix of resource port fields
    /// (`audio-port`, `video-port`, ...).
    pub fn name(self) -> &'static str {
        match self {
            StreamType::Audio => "audio",
            StreamType::Video => "video",
            StreamType::Text => "text",
            StreamType::Unknown => "unknown",
        }
    }

    /// Factory name of the placeholder decoder for this stream type.
    pub fn placeholder_factory(self) -> Option<&'static str> {
        match self {
            StreamType::Audio => Some("fakeadec"),
            StreamType::Video => Some("fakevdec"),
            StreamType::Text | StreamType::Unknown => None,
        }
    }

    /// Caps the proxy announces downstream before a decoder has run.
    pub fn proxy_output_caps(self) -> Option<Caps> {
        match self {
            StreamType::Audio => Some(Caps::new_simple("audio/x-media")),
            StreamType::Video => Some(Caps::new_simple("video/x-raw")),
            StreamType::Text | StreamType::Unknown => None,
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify a media type name by prefix.
///
/// Video and image types are checked first, then audio, then the
/// text-like families.
pub fn classify_name(name: &str) -> StreamType {
    const TEXT_PREFIXES: [&str; 4] = ["text/", "application/", "subpicture/", "subtitle/"];

    if name.starts_with("video/") || name.starts_with("image/") {
        StreamType::Video
    } else if name.starts_with("audio/") {
        StreamType::Audio
    } else if TEXT_PREFIXES.iter().any(|p| name.starts_with(p)) {
        StreamType::Text
    } else {
        StreamType::Unknown
    }
}

/// Classify a format descriptor by the name of its first structure.
///
/// ANY or empty caps classify as [`StreamType::Unknown`].
pub fn classify(caps: &Caps) -> StreamType {
    caps.media_type().map_or(StreamType::Unknown, classify_name)
}
