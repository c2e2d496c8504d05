//! Resource activation signals.
//!
//! A downstream resource manager tells a proxy whether it may run a real
//! decoder by sending an `acquired-resource` upstream event:
//!
//! ```text
//! acquired-resource, active=(boolean)true, video-port=(int)1
//! ```
//!
//! The parameters are accumulated into the node's [`ResourceInfo`], which
//! is handed to every decoder the node creates afterwards.

use super::classify::StreamType;
use crate::event::Event;
use crate::format::{Structure, Value};

/// Name of the activation event structure.
pub const ACQUIRED_RESOURCE: &str = "acquired-resource";

/// Resource parameters granted to a node.
///
/// Fields are only ever added or updated; once a port is bound it stays
/// bound for the life of the node.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInfo {
    inner: Structure,
}

impl ResourceInfo {
    /// Start from the parameters of a first activation.
    pub fn new(params: &Structure) -> Self {
        let mut inner = params.clone();
        inner.set_name(ACQUIRED_RESOURCE);
        Self { inner }
    }

    /// Merge later parameters in place.
    pub fn merge(&mut self, params: &Structure) {
        self.inner.merge_from(params);
    }

    /// The last requested activation flag.
    pub fn active(&self) -> bool {
        self.inner.get_bool("active").unwrap_or(false)
    }

    /// Port assigned for a stream type (`<type>-port`).
    pub fn port(&self, stream_type: StreamType) -> Option<i64> {
        self.inner.get_int(&format!("{}-port", stream_type.name()))
    }

    /// The underlying structure.
    pub fn as_structure(&self) -> &Structure {
        &self.inner
    }

    /// Property value handed to decoders.
    pub fn to_value(&self) -> Value {
        Value::from(self.inner.clone())
    }
}

/// A parsed activation signal.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationRequest {
    /// Whether a real decoder may run.
    pub active: bool,
    /// All parameters carried by the signal, `active` included.
    pub params: Structure,
}

impl ActivationRequest {
    /// Build a request with no port assignment.
    pub fn new(active: bool) -> Self {
        Self {
            active,
            params: Structure::builder(ACQUIRED_RESOURCE)
                .field("active", active)
                .build(),
        }
    }

    /// Assign a port for a stream type.
    pub fn with_port(mut self, stream_type: StreamType, port: i64) -> Self {
        self.params
            .set(format!("{}-port", stream_type.name()), Value::Int(port));
        self
    }

    /// Parse an upstream event; `None` if it is not an activation signal.
    ///
    /// A missing `active` field reads as `false`.
    pub fn from_event(event: &Event) -> Option<Self> {
        if !event.is_upstream() || !event.has_name(ACQUIRED_RESOURCE) {
            return None;
        }
        let params = event.structure()?.clone();
        Some(Self {
            active: params.get_bool("active").unwrap_or(false),
            params,
        })
    }

    /// Wrap as an upstream event.
    pub fn into_event(self) -> Event {
        let mut params = self.params;
        params.set("active", self.active);
        Event::CustomUpstream(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_round_trip_through_event() {
        let event = ActivationRequest::new(true)
            .with_port(StreamType::Video, 1)
            .into_event();
        assert!(event.has_name(ACQUIRED_RESOURCE));

        let req = ActivationRequest::from_event(&event).unwrap();
        assert!(req.active);
        assert_eq!(req.params.get_int("video-port"), Some(1));
    }

    #[test]
    fn test_other_events_ignored() {
        assert!(ActivationRequest::from_event(&Event::Eos).is_none());
        let other = Event::CustomUpstream(Structure::new("force-key-unit"));
        assert!(ActivationRequest::from_event(&other).is_none());
        // Activation only travels upstream.
        let downstream = Event::CustomDownstream(Structure::new(ACQUIRED_RESOURCE));
        assert!(ActivationRequest::from_event(&downstream).is_none());
    }

    #[test]
    fn test_missing_active_is_false() {
        let event = Event::CustomUpstream(Structure::new(ACQUIRED_RESOURCE));
        assert!(!ActivationRequest::from_event(&event).unwrap().active);
    }

    #[test]
    fn test_resource_info_merge_keeps_ports() {
        let first = ActivationRequest::new(true).with_port(StreamType::Audio, 2);
        let mut info = ResourceInfo::new(&first.params);
        assert!(info.active());
        assert_eq!(info.port(StreamType::Audio), Some(2));

        // Later signal without a port only flips the flag.
        info.merge(&ActivationRequest::new(false).params);
        assert!(!info.active());
        assert_eq!(info.port(StreamType::Audio), Some(2));

        // A new port binding updates in place.
        info.merge(&ActivationRequest::new(true).with_port(StreamType::Video, 0).params);
        assert_eq!(info.port(StreamType::Video), Some(0));
        assert_eq!(info.port(StreamType::Audio), Some(2));
        assert_eq!(info.as_structure().name(), ACQUIRED_RESOURCE);
    }
}
