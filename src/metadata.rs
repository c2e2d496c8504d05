//! Buffer metadata types.

use std::time::Duration;

/// Flags indicating buffer properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferFlags {
    /// Buffer is corrupted or carries no usable payload.
    ///
    /// Placeholder decoders use this to tell downstream that the stream
    /// is not supported and should be skipped.
    pub corrupted: bool,
    /// Buffer is a gap/discontinuity marker.
    pub gap: bool,
}

impl BufferFlags {
    /// Set the gap flag.
    pub fn set_gap(&mut self, value: bool) {
        self.gap = value;
    }

    /// Check if gap flag is set.
    pub fn is_gap(&self) -> bool {
        self.gap
    }

    /// Set the corrupted flag.
    pub fn set_corrupted(&mut self, value: bool) {
        self.corrupted = value;
    }

    /// Check if corrupted flag is set.
    pub fn is_corrupted(&self) -> bool {
        self.corrupted
    }
}

/// Metadata associated with a buffer.
///
/// Timing information, a sequence number and flags.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// Presentation timestamp.
    pub pts: Option<Duration>,

    /// Decode timestamp.
    pub dts: Option<Duration>,

    /// Duration of this buffer's content.
    pub duration: Option<Duration>,

    /// Monotonic sequence number within a stream.
    pub sequence: u64,

    /// Buffer flags.
    pub flags: BufferFlags,
}

impl Metadata {
    /// Create new metadata with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create metadata with a sequence number.
    pub fn with_sequence(sequence: u64) -> Self {
        Self {
            sequence,
            ..Default::default()
        }
    }

    /// Set the presentation timestamp.
    pub fn with_pts(mut self, pts: Duration) -> Self {
        self.pts = Some(pts);
        self
    }

    /// Set the duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Mark the buffer as corrupted.
    pub fn with_corrupted(mut self) -> Self {
        self.flags.corrupted = true;
        self
    }

    /// Copy only the timing fields (pts, dts, duration, sequence).
    pub fn timing(&self) -> Self {
        Self {
            pts: self.pts,
            dts: self.dts,
            duration: self.duration,
            sequence: self.sequence,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder() {
        let meta = Metadata::with_sequence(42)
            .with_pts(Duration::from_millis(100))
            .with_duration(Duration::from_millis(33));

        assert_eq!(meta.sequence, 42);
        assert_eq!(meta.pts, Some(Duration::from_millis(100)));
        assert_eq!(meta.duration, Some(Duration::from_millis(33)));
    }

    #[test]
    fn test_timing_drops_flags() {
        let meta = Metadata::with_sequence(7)
            .with_pts(Duration::from_millis(5))
            .with_corrupted();

        let timing = meta.timing();
        assert_eq!(timing.sequence, 7);
        assert_eq!(timing.pts, Some(Duration::from_millis(5)));
        assert!(!timing.flags.is_corrupted());
    }
}
