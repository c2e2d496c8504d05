//! Tracing spans for proxy nodes.

use tracing::{Level, Span, span};

/// Create a span covering work done by a proxy node.
///
/// # Example
///
/// ```rust
/// use decproxy::observability::span_node;
///
/// let span = span_node("decproxy0");
/// let _guard = span.enter();
/// ```
#[inline]
pub fn span_node(name: &str) -> Span {
    span!(Level::DEBUG, "node", name = %name)
}

/// Create a span for one decoder swap.
#[inline]
pub fn span_swap(node: &str, to_decoder: bool) -> Span {
    let target = if to_decoder { "decoder" } else { "placeholder" };
    span!(Level::DEBUG, "swap", node = %node, target)
}
