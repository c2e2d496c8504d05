//! Element system for decoder pipelines.
//!
//! This module defines the contract between a pipeline node and the
//! decoder instances it links:
//!
//! - [`DecoderElement`]: a replaceable decoder instance
//! - [`PadTarget`]: the downstream side of a link
//! - [`BlockingProbe`] / [`DrainProbe`]: interceptors used to swap an
//!   instance while data is flowing
//!
//! # Design
//!
//! Processing is synchronous: `chain` and `sink_event` return an
//! [`Output`] and the caller forwards it. The streaming threads belong to
//! whoever pushes data; elements never spawn their own.

mod probe;
mod state;
mod traits;

pub use probe::{BlockingProbe, DrainProbe, ProbeId};
pub use state::ElementState;
pub use traits::{DecoderElement, Output, PadTarget};
