//! Media-info records posted to the application.
//!
//! A record is a `media-info` structure with `stream-id`, `type` and
//! `mime-type` fields followed by the stream's own parameters, taken
//! either from its caps or from its tags.

use super::classify::{StreamType, classify_name};
use crate::event::{TagList, tag_names};
use crate::format::{Caps, Structure};

/// Name of media-info structures.
pub const MEDIA_INFO: &str = "media-info";

/// Tags dropped from tag-based records.
const TAG_BLACKLIST: [&str; 4] = [
    tag_names::BITRATE,
    tag_names::NOMINAL_BITRATE,
    tag_names::MINIMUM_BITRATE,
    tag_names::MAXIMUM_BITRATE,
];

fn header(stream_id: &str, mime_type: &str) -> Structure {
    let stream_type: StreamType = classify_name(mime_type);
    Structure::builder(MEDIA_INFO)
        .field("stream-id", stream_id)
        .field("type", stream_type.as_int())
        .field("mime-type", mime_type)
        .build()
}

/// Build a record from a format descriptor.
///
/// Every field of the first caps structure is copied. The three header
/// fields are authoritative: a caps field with the same name does not
/// replace them.
pub fn to_metadata(caps: &Caps, stream_id: &str) -> Structure {
    let mime_type = caps.media_type().unwrap_or_default();
    let mut record = header(stream_id, mime_type);
    if let Some(s) = caps.structure(0) {
        for (k, v) in s.iter() {
            if !record.has_field(k) {
                record.set(k, v.clone());
            }
        }
    }
    record
}

/// Build a record from container tags.
///
/// Bitrate-family tags are dropped. Returns `None` when no tag is left.
pub fn tags_to_metadata(tags: &TagList, stream_id: &str, mime_type: &str) -> Option<Structure> {
    let mut kept = tags
        .iter()
        .filter(|(k, _)| !TAG_BLACKLIST.contains(k))
        .peekable();
    kept.peek()?;

    let mut record = header(stream_id, mime_type);
    for (k, v) in kept {
        if !record.has_field(k) {
            record.set(k, v.clone());
        }
    }
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Value;

    #[test]
    fn test_to_metadata_copies_all_fields() {
        let caps = Caps::from_structure(
            Structure::builder("video/x-h264")
                .field("width", 1920)
                .field("height", 1080)
                .field("stream-format", "byte-stream")
                .build(),
        );

        let record = to_metadata(&caps, "s1");
        assert_eq!(record.name(), MEDIA_INFO);
        assert_eq!(record.get_str("stream-id"), Some("s1"));
        assert_eq!(record.get_int("type"), Some(StreamType::Video.as_int() as i64));
        assert_eq!(record.get_str("mime-type"), Some("video/x-h264"));
        assert_eq!(record.get_int("width"), Some(1920));
        assert_eq!(record.get_int("height"), Some(1080));
        assert_eq!(record.get_str("stream-format"), Some("byte-stream"));
        assert_eq!(record.len(), 6);
    }

    #[test]
    fn test_to_metadata_header_wins() {
        let caps = Caps::from_structure(
            Structure::builder("video/x-h264")
                .field("stream-id", "from-caps")
                .field("type", 7)
                .build(),
        );

        let record = to_metadata(&caps, "xxx-stream-id-xxx");
        assert_eq!(record.get_str("stream-id"), Some("xxx-stream-id-xxx"));
        assert_eq!(record.get_int("type"), Some(1));
    }

    #[test]
    fn test_tags_to_metadata_filters_bitrates() {
        let mut tags = TagList::new();
        tags.set(tag_names::BITRATE, 128_000u64);
        tags.set(tag_names::MAXIMUM_BITRATE, 192_000u64);
        tags.set(tag_names::LANGUAGE_CODE, "ko");
        tags.set(tag_names::AUDIO_CODEC, "AC-3");

        let record = tags_to_metadata(&tags, "s2", "audio/x-ac3").unwrap();
        assert_eq!(record.get_int("type"), Some(0));
        assert_eq!(record.get_str("language-code"), Some("ko"));
        assert_eq!(record.get("audio-codec"), Some(&Value::from("AC-3")));
        assert!(!record.has_field(tag_names::BITRATE));
        assert!(!record.has_field(tag_names::MAXIMUM_BITRATE));
    }

    #[test]
    fn test_tags_to_metadata_nothing_left() {
        assert!(tags_to_metadata(&TagList::new(), "s", "audio/mpeg").is_none());

        let mut tags = TagList::new();
        tags.set(tag_names::NOMINAL_BITRATE, 1u64);
        tags.set(tag_names::MINIMUM_BITRATE, 1u64);
        assert!(tags_to_metadata(&tags, "s", "audio/mpeg").is_none());
    }
}
