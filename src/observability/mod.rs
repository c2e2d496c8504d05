//! Observability features: metrics and tracing.
//!
//! - **Metrics**: Counters and histograms via `metrics-rs`
//! - **Tracing**: Structured logging and spans via `tracing`
//!
//! ## Metrics
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `decproxy_swaps_total` | Counter | Swaps completed (`target` = decoder/placeholder) |
//! | `decproxy_swaps_aborted` | Counter | Swaps aborted, previous instance kept |
//! | `decproxy_swap_duration_ns` | Histogram | Time the input was blocked for a swap |
//! | `decproxy_resolution_failures` | Counter | Resolutions that found no decoder |
//! | `decproxy_buffers_passed` | Counter | Buffers admitted into a node |
//! | `decproxy_bytes_passed` | Counter | Bytes admitted into a node |
//!
//! ## Tracing
//!
//! Proxy nodes log protocol steps at `debug`, state changes at `info`,
//! degraded outcomes at `warn` and fatal ones at `error`, all with a
//! `node` field. Swaps run inside a `swap` span.
//!
//! ## Example
//!
//! ```rust,ignore
//! use decproxy::observability::init_metrics;
//!
//! // Initialize metrics (call once at startup)
//! init_metrics();
//!
//! // Install any metrics exporter (prometheus, statsd, ...) to collect them
//! ```

mod metrics;
mod tracing_support;

pub use metrics::{NodeMetrics, init_metrics};
pub use tracing_support::{span_node, span_swap};
