//! Metrics collection using metrics-rs.

use metrics::{Counter, Histogram, Unit, counter, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Whether metrics have been initialized.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

// Metric names as constants for consistency
const SWAPS_TOTAL: &str = "decproxy_swaps_total";
const SWAPS_ABORTED: &str = "decproxy_swaps_aborted";
const SWAP_DURATION_NS: &str = "decproxy_swap_duration_ns";
const RESOLUTION_FAILURES: &str = "decproxy_resolution_failures";
const BUFFERS_PASSED: &str = "decproxy_buffers_passed";
const BYTES_PASSED: &str = "decproxy_bytes_passed";

/// Initialize metrics descriptions.
///
/// Call this once at application startup before using any metrics.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(
        SWAPS_TOTAL,
        Unit::Count,
        "Decoder swaps completed, labelled by target"
    );
    metrics::describe_counter!(
        SWAPS_ABORTED,
        Unit::Count,
        "Decoder swaps aborted with the previous decoder kept"
    );
    metrics::describe_histogram!(
        SWAP_DURATION_NS,
        Unit::Nanoseconds,
        "Time from blocking the input to unblocking it during a swap"
    );
    metrics::describe_counter!(
        RESOLUTION_FAILURES,
        Unit::Count,
        "Decoder resolutions that found no usable decoder"
    );
    metrics::describe_counter!(
        BUFFERS_PASSED,
        Unit::Count,
        "Buffers admitted into a proxy node"
    );
    metrics::describe_counter!(BYTES_PASSED, Unit::Bytes, "Bytes admitted into a proxy node");
}

/// Metrics handles for one proxy node.
///
/// Labels are set up once so the hot path only increments.
#[derive(Clone)]
pub struct NodeMetrics {
    buffers: Counter,
    bytes: Counter,
    swaps_to_decoder: Counter,
    swaps_to_placeholder: Counter,
    swaps_aborted: Counter,
    swap_duration: Histogram,
    resolution_failures: Counter,
}

impl NodeMetrics {
    /// Create metrics handles labelled with the node name.
    pub fn new(node: &str) -> Self {
        Self {
            buffers: counter!(BUFFERS_PASSED, "node" => node.to_string()),
            bytes: counter!(BYTES_PASSED, "node" => node.to_string()),
            swaps_to_decoder: counter!(
                SWAPS_TOTAL,
                "node" => node.to_string(),
                "target" => "decoder"
            ),
            swaps_to_placeholder: counter!(
                SWAPS_TOTAL,
                "node" => node.to_string(),
                "target" => "placeholder"
            ),
            swaps_aborted: counter!(SWAPS_ABORTED, "node" => node.to_string()),
            swap_duration: histogram!(SWAP_DURATION_NS, "node" => node.to_string()),
            resolution_failures: counter!(RESOLUTION_FAILURES, "node" => node.to_string()),
        }
    }

    /// Record a buffer entering the node.
    #[inline]
    pub fn record_buffer(&self, bytes: usize) {
        self.buffers.increment(1);
        self.bytes.increment(bytes as u64);
    }

    /// Record a completed swap.
    pub fn record_swap(&self, to_decoder: bool, duration: Duration) {
        if to_decoder {
            self.swaps_to_decoder.increment(1);
        } else {
            self.swaps_to_placeholder.increment(1);
        }
        self.swap_duration.record(duration.as_nanos() as f64);
    }

    /// Record an aborted swap.
    pub fn record_swap_aborted(&self) {
        self.swaps_aborted.increment(1);
    }

    /// Record a failed decoder resolution.
    pub fn record_resolution_failure(&self) {
        self.resolution_failures.increment(1);
    }
}

impl std::fmt::Debug for NodeMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeMetrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_idempotent() {
        init_metrics();
        init_metrics();
    }

    #[test]
    fn test_node_metrics_without_recorder() {
        // No recorder installed: recording is a no-op.
        let m = NodeMetrics::new("decproxy0");
        m.record_buffer(188);
        m.record_swap(true, Duration::from_micros(40));
        m.record_swap_aborted();
        m.record_resolution_failure();
    }
}
