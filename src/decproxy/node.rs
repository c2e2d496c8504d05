//! The proxy node.
//!
//! A [`ProxyNode`] sits between a demuxer and the rest of the pipeline.
//! Its data path is fixed at both ends (a front and a back identity
//! stage) with exactly one decoder instance linked in between:
//!
//! ```text
//!   chain / sink_event
//!          │
//!      [ gate ] ── front ──► [ placeholder | real decoder ] ──► [ drain ] ── back ──► downstream
//! ```
//!
//! The linked instance starts as a placeholder once the first caps arrive
//! and is exchanged for a real decoder (and back) when activation signals
//! come in from downstream. An exchange is a *swap*: the gate parks
//! incoming data, the old instance is drained with an EOS that the drain
//! probe keeps from reaching downstream, the replacement is created and
//! fed the sticky events, and the gate reopens. No buffer is lost,
//! duplicated or reordered across a swap.
//!
//! # Locking
//!
//! Two locks, always taken in this order:
//!
//! 1. the stream lock (`StreamPath`), held while data flows through the
//!    linked instance and for the whole body of a swap;
//! 2. the state lock (`NodeState`), held only briefly and never across a
//!    call into a decoder or downstream.
//!
//! Activation signals may arrive on the streaming thread itself, from
//! inside a downstream `push`. Such a call finds the stream lock owned by
//! its own thread, records the new target and returns; the data path runs
//! the swap once it has released the stream lock.

use super::activation::{ActivationRequest, ResourceInfo};
use super::classify::{StreamType, classify};
use super::factory::DECPROXY;
use super::mediainfo::{tags_to_metadata, to_metadata};
use super::resolver::resolve;
use crate::buffer::Buffer;
use crate::bus::{Bus, Message, StreamErrorKind};
use crate::config::DecodeConfig;
use crate::element::{BlockingProbe, DecoderElement, DrainProbe, ElementState, Output, PadTarget};
use crate::elements::{Identity, IdentityStats, PROP_ACTIVE_MODE, PROP_RESOURCE_INFO};
use crate::error::{Error, Result};
use crate::event::{Event, PipelineItem, SegmentEvent, StreamStartEvent, TagList, TagsEvent};
use crate::format::{Caps, Value};
use crate::observability::{NodeMetrics, span_node, span_swap};
use crate::registry::FactoryRegistry;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Property real decoders expose for their input queue depth.
pub const PROP_INPUT_BUFFERS: &str = "input-buffers";
/// Property real decoders expose for their output queue depth.
pub const PROP_OUTPUT_BUFFERS: &str = "output-buffers";

/// Lifecycle of a proxy node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyState {
    /// No caps seen yet; nothing is linked.
    Unresolved,
    /// A placeholder decoder is linked.
    PlaceholderActive,
    /// A real decoder is linked.
    DecoderActive,
    /// No safe instance could be linked; data is refused.
    Failed,
}

impl ProxyState {
    /// Whether an instance is linked.
    pub fn is_linked(self) -> bool {
        matches!(self, ProxyState::PlaceholderActive | ProxyState::DecoderActive)
    }
}

impl fmt::Display for ProxyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProxyState::Unresolved => "unresolved",
            ProxyState::PlaceholderActive => "placeholder-active",
            ProxyState::DecoderActive => "decoder-active",
            ProxyState::Failed => "failed",
        })
    }
}

/// Last value of each sticky event seen on the input.
#[derive(Debug, Default, Clone)]
struct StickyEvents {
    stream_start: Option<StreamStartEvent>,
    caps: Option<Caps>,
    segment: Option<SegmentEvent>,
    tags: Option<TagList>,
}

impl StickyEvents {
    fn store(&mut self, event: &Event) {
        match event {
            Event::StreamStart(s) => self.stream_start = Some(s.clone()),
            Event::Caps(c) => self.caps = Some(c.clone()),
            Event::Segment(s) => self.segment = Some(s.clone()),
            Event::Tags(t) => self
                .tags
                .get_or_insert_with(TagList::new)
                .merge(&t.tags, t.mode),
            _ => {}
        }
    }

    fn stream_id(&self) -> Option<&str> {
        self.stream_start.as_ref().map(|s| s.stream_id.as_str())
    }

    fn mime_type(&self) -> &str {
        self.caps
            .as_ref()
            .and_then(|c| c.media_type())
            .unwrap_or_default()
    }

    fn is_trick_mode(&self) -> bool {
        self.segment.as_ref().is_some_and(SegmentEvent::is_trick_mode)
    }

    /// Events to bring a fresh instance up to the current stream position.
    fn replay(&self) -> Vec<Event> {
        let mut events = Vec::with_capacity(4);
        if let Some(s) = &self.stream_start {
            events.push(Event::StreamStart(s.clone()));
        }
        if let Some(c) = &self.caps {
            events.push(Event::Caps(c.clone()));
        }
        if let Some(s) = &self.segment {
            events.push(Event::Segment(s.clone()));
        }
        if let Some(t) = &self.tags {
            events.push(Event::Tags(TagsEvent::new(t.clone())));
        }
        events
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Everything the streaming thread touches, behind the stream lock.
struct StreamPath {
    slot: Option<Box<dyn DecoderElement>>,
    /// The linked instance is a placeholder standing in for a decoder
    /// that could not be used; keeps `active-mode` on.
    degraded: bool,
    sticky: StickyEvents,
    downstream: Option<Arc<dyn PadTarget>>,
    drain: DrainProbe,
}

/// Bookkeeping shared with control threads, behind the state lock.
#[derive(Debug)]
struct NodeState {
    proxy_state: ProxyState,
    element_state: ElementState,
    stream_type: Option<StreamType>,
    resource_info: Option<ResourceInfo>,
    /// Activation received before the stream type was known.
    pending_activation: Option<bool>,
    /// Last requested activation.
    target_active: bool,
    /// Activation the linked instance reflects.
    applied_active: bool,
    swapping: bool,
    stream_owner: Option<ThreadId>,
    /// Bumped on every reset to Null; swaps started before it are stale.
    generation: u64,
    swap_count: u64,
    current_factory: Option<String>,
}

impl NodeState {
    fn new() -> Self {
        Self {
            proxy_state: ProxyState::Unresolved,
            element_state: ElementState::Null,
            stream_type: None,
            resource_info: None,
            pending_activation: None,
            target_active: false,
            applied_active: false,
            swapping: false,
            stream_owner: None,
            generation: 0,
            swap_count: 0,
            current_factory: None,
        }
    }
}

/// Stream lock guard that records the owning thread.
struct StreamGuard<'a> {
    node: &'a ProxyNode,
    path: MutexGuard<'a, StreamPath>,
}

impl Deref for StreamGuard<'_> {
    type Target = StreamPath;

    fn deref(&self) -> &StreamPath {
        &self.path
    }
}

impl DerefMut for StreamGuard<'_> {
    fn deref_mut(&mut self) -> &mut StreamPath {
        &mut self.path
    }
}

impl Drop for StreamGuard<'_> {
    fn drop(&mut self) {
        self.node.lock_state().stream_owner = None;
        trace!(node = %self.node.name, "stream unlocked");
    }
}

/// Builder for [`ProxyNode`].
pub struct ProxyNodeBuilder {
    name: String,
    registry: Arc<FactoryRegistry>,
    self_factory: String,
    bus: Bus,
    decode: DecodeConfig,
}

impl ProxyNodeBuilder {
    /// Instance name used in logs and bus messages.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Factory name of the proxy itself, never chosen as its own decoder.
    ///
    /// Defaults to the general `decproxy` factory.
    pub fn self_factory(mut self, factory: impl Into<String>) -> Self {
        self.self_factory = factory.into();
        self
    }

    /// Bus to post application messages on.
    pub fn bus(mut self, bus: Bus) -> Self {
        self.bus = bus;
        self
    }

    /// Decoder buffering settings.
    pub fn decode_config(mut self, decode: DecodeConfig) -> Self {
        self.decode = decode;
        self
    }

    /// Build the node.
    pub fn build(self) -> ProxyNode {
        let gate = BlockingProbe::new();
        // Nothing flows until the node leaves Null.
        gate.set_flushing(true);

        ProxyNode {
            front: Identity::new().with_name(format!("{}-front", self.name)),
            back: Identity::new().with_name(format!("{}-back", self.name)),
            metrics: NodeMetrics::new(&self.name),
            name: self.name,
            registry: self.registry,
            self_factory: self.self_factory,
            bus: self.bus,
            decode: self.decode,
            gate,
            stream: Mutex::new(StreamPath {
                slot: None,
                degraded: false,
                sticky: StickyEvents::default(),
                downstream: None,
                drain: DrainProbe::new(),
            }),
            state: Mutex::new(NodeState::new()),
        }
    }
}

/// A decoder proxy node.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use decproxy::decproxy::{ProxyNode, ProxyState};
/// use decproxy::element::ElementState;
/// use decproxy::elements::{ItemCollector, register_builtin};
/// use decproxy::event::Event;
/// use decproxy::format::Caps;
/// use decproxy::registry::FactoryRegistry;
///
/// let registry = Arc::new(FactoryRegistry::new());
/// register_builtin(&registry);
///
/// let node = ProxyNode::builder(registry).name("decproxy0").build();
/// let out = Arc::new(ItemCollector::new());
/// node.link(out.clone());
/// node.set_state(ElementState::Playing).unwrap();
///
/// node.sink_event(Event::Caps(Caps::new_simple("video/x-h264"))).unwrap();
/// assert_eq!(node.state(), ProxyState::PlaceholderActive);
/// assert_eq!(node.current_factory().as_deref(), Some("fakevdec"));
/// ```
pub struct ProxyNode {
    name: String,
    registry: Arc<FactoryRegistry>,
    self_factory: String,
    bus: Bus,
    decode: DecodeConfig,
    metrics: NodeMetrics,
    front: Identity,
    back: Identity,
    gate: BlockingProbe,
    stream: Mutex<StreamPath>,
    state: Mutex<NodeState>,
}

impl ProxyNode {
    /// Start building a node that resolves decoders from `registry`.
    pub fn builder(registry: Arc<FactoryRegistry>) -> ProxyNodeBuilder {
        ProxyNodeBuilder {
            name: "decproxy".to_string(),
            registry,
            self_factory: DECPROXY.to_string(),
            bus: Bus::default(),
            decode: DecodeConfig::default(),
        }
    }

    // ------------------------------------------------------------------
    // Locks
    // ------------------------------------------------------------------

    fn lock_state(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the stream lock.
    ///
    /// Not reentrant: a thread already holding it must not call back
    /// into anything that takes it again.
    fn lock_stream(&self) -> StreamGuard<'_> {
        trace!(node = %self.name, "locking stream");
        let path = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        self.lock_state().stream_owner = Some(thread::current().id());
        trace!(node = %self.name, "stream locked");
        StreamGuard { node: self, path }
    }

    fn transition(&self, st: &mut NodeState, to: ProxyState) {
        let from = st.proxy_state;
        if from == to {
            return;
        }
        st.proxy_state = to;
        info!(node = %self.name, %from, %to, "proxy state changed");
        self.bus.post(Message::StateChanged {
            source: self.name.clone(),
            from,
            to,
        });
    }

    // ------------------------------------------------------------------
    // Linking
    // ------------------------------------------------------------------

    /// Connect the node's output.
    pub fn link(&self, downstream: Arc<dyn PadTarget>) {
        self.lock_stream().downstream = Some(downstream);
    }

    /// Disconnect the node's output.
    pub fn unlink(&self) {
        self.lock_stream().downstream = None;
    }

    /// Whether an output is connected.
    pub fn is_linked(&self) -> bool {
        self.stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .downstream
            .is_some()
    }

    fn push_downstream(&self, path: &StreamPath, item: PipelineItem) -> Result<()> {
        self.back.observe(&item);
        match &path.downstream {
            Some(target) => target.push(item),
            None => Err(Error::NotLinked(format!("{} has no downstream", self.name))),
        }
    }

    /// Forward instance output through the drain probe.
    fn push_output(&self, path: &mut StreamPath, out: Output) -> Result<()> {
        for item in out {
            if let Some(item) = path.drain.filter(item) {
                self.push_downstream(path, item)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Data path
    // ------------------------------------------------------------------

    /// Push one buffer in.
    ///
    /// Blocks while a swap is in progress. Fails with
    /// [`Error::Flushing`] while the node is in Null.
    pub fn chain(&self, buffer: Buffer) -> Result<()> {
        self.front.observe_buffer(&buffer);
        self.metrics.record_buffer(buffer.len());
        self.gate.wait_open()?;

        let result = self.chain_locked(buffer);
        self.run_pending_swaps();
        result
    }

    fn chain_locked(&self, buffer: Buffer) -> Result<()> {
        let mut path = self.lock_stream();
        let Some(instance) = path.slot.as_mut() else {
            return Err(self.unlinked_error());
        };
        let out = instance.chain(buffer)?;
        self.push_output(&mut path, out)
    }

    fn unlinked_error(&self) -> Error {
        match self.lock_state().proxy_state {
            ProxyState::Unresolved => Error::NotNegotiated(format!("{}: no caps received", self.name)),
            _ => Error::NotLinked(format!("{}: no decoder linked", self.name)),
        }
    }

    /// Push one downstream event in.
    ///
    /// Serialized events wait behind a swap like buffers do; flush events
    /// pass the gate.
    pub fn sink_event(&self, event: Event) -> Result<()> {
        self.front.observe_event(&event);
        if !event.is_serialized() {
            let mut path = self.lock_stream();
            let out = match path.slot.as_mut() {
                Some(instance) => instance.sink_event(event)?,
                None => Output::event(event),
            };
            return self.push_output(&mut path, out);
        }

        self.gate.wait_open()?;
        let result = self.sink_event_locked(event);
        self.run_pending_swaps();
        result
    }

    fn sink_event_locked(&self, event: Event) -> Result<()> {
        let mut path = self.lock_stream();
        path.sticky.store(&event);

        match &event {
            Event::Caps(caps) => {
                let stream_id = self.stream_id(&path);
                self.bus.post(Message::MediaInfo {
                    source: self.name.clone(),
                    record: to_metadata(caps, &stream_id),
                });
                if self.lock_state().proxy_state == ProxyState::Unresolved {
                    return self.first_caps(&mut path, caps.clone());
                }
            }
            Event::Tags(tags) => {
                let stream_id = self.stream_id(&path);
                if let Some(record) = tags_to_metadata(&tags.tags, &stream_id, path.sticky.mime_type()) {
                    self.bus.post(Message::MediaInfo {
                        source: self.name.clone(),
                        record,
                    });
                }
            }
            Event::Segment(segment) => {
                let active = segment.is_trick_mode() || path.degraded;
                if let Some(instance) = path.slot.as_mut() {
                    set_active_mode(instance.as_mut(), active);
                }
            }
            _ => {}
        }

        let out = match path.slot.as_mut() {
            Some(instance) => instance.sink_event(event)?,
            // Sticky events wait for an instance; they are replayed to it.
            None if event.is_sticky() => return Ok(()),
            None => Output::event(event),
        };
        self.push_output(&mut path, out)
    }

    fn stream_id(&self, path: &StreamPath) -> String {
        path.sticky
            .stream_id()
            .map_or_else(|| self.name.clone(), str::to_string)
    }

    /// Link the placeholder for a freshly classified stream.
    fn first_caps(&self, path: &mut StreamPath, caps: Caps) -> Result<()> {
        let stream_type = classify(&caps);
        let (resource_info, element_state) = {
            let mut st = self.lock_state();
            st.stream_type = Some(stream_type);
            (st.resource_info.clone(), st.element_state)
        };
        info!(node = %self.name, %stream_type, %caps, "stream classified");

        let mut instance = match self.make_placeholder(stream_type) {
            Ok(instance) => instance,
            Err(e) => {
                error!(node = %self.name, %stream_type, "no placeholder for stream");
                self.bus.post_error(
                    &self.name,
                    StreamErrorKind::Failed,
                    format!("no decoder available for {stream_type} stream"),
                );
                self.transition(&mut self.lock_state(), ProxyState::Failed);
                return Err(e);
            }
        };
        self.configure(
            instance.as_mut(),
            false,
            resource_info.as_ref(),
            path.sticky.is_trick_mode(),
            element_state,
        );
        let factory = instance.factory_name().to_string();
        let caps_out = instance.sink_event(Event::Caps(caps));
        path.slot = Some(instance);
        path.degraded = false;

        {
            let mut st = self.lock_state();
            st.current_factory = Some(factory);
            self.transition(&mut st, ProxyState::PlaceholderActive);
            if let Some(active) = st.pending_activation.take() {
                info!(node = %self.name, active, "applying deferred activation");
                st.target_active = active;
            }
        }

        // Downstream learns the stream before anything the placeholder emits.
        let stream_id = self.stream_id(path);
        self.push_downstream(path, Event::StreamStart(StreamStartEvent::new(stream_id)).into())?;
        if let Some(out_caps) = stream_type.proxy_output_caps() {
            self.push_downstream(path, Event::Caps(out_caps).into())?;
        }
        self.push_output(path, caps_out?)
    }

    // ------------------------------------------------------------------
    // Instance creation
    // ------------------------------------------------------------------

    fn make_placeholder(&self, stream_type: StreamType) -> Result<Box<dyn DecoderElement>> {
        let factory = stream_type
            .placeholder_factory()
            .ok_or(Error::PlaceholderUnavailable(stream_type))?;
        self.registry.make(factory).map_err(|e| {
            warn!(node = %self.name, factory, error = %e, "cannot create placeholder");
            Error::PlaceholderUnavailable(stream_type)
        })
    }

    fn make_decoder(&self, caps: &Caps) -> Result<Box<dyn DecoderElement>> {
        let candidate = resolve(&self.registry, caps, Some(&self.self_factory))?;
        debug!(
            node = %self.name,
            decoder = candidate.name(),
            rank = %candidate.rank,
            "actual decoder will be deployed"
        );
        self.registry.make_from(candidate.factory.as_ref())
    }

    /// Placeholder linked when a real decoder was wanted but not usable.
    fn degraded_placeholder(&self, stream_type: StreamType) -> Result<Box<dyn DecoderElement>> {
        let mut placeholder = self.make_placeholder(stream_type)?;
        if stream_type == StreamType::Audio {
            set_active_mode(placeholder.as_mut(), true);
            warn!(node = %self.name, "audio not supported by any decoder");
            self.bus.post_warning(
                &self.name,
                StreamErrorKind::CodecNotFound,
                "This audio is not supported by decoder",
            );
        } else {
            debug!(node = %self.name, %stream_type, "no decoder, keeping placeholder");
        }
        Ok(placeholder)
    }

    fn configure(
        &self,
        instance: &mut dyn DecoderElement,
        real: bool,
        resource_info: Option<&ResourceInfo>,
        active_mode: bool,
        state: ElementState,
    ) {
        if let Some(info) = resource_info {
            if instance.has_property(PROP_RESOURCE_INFO) {
                match instance.set_property(PROP_RESOURCE_INFO, info.to_value()) {
                    Ok(()) => debug!(node = %self.name, instance = instance.name(), "resource-info handed over"),
                    Err(e) => warn!(node = %self.name, error = %e, "cannot set resource-info"),
                }
            }
        }
        if real {
            let sizes = [
                (PROP_INPUT_BUFFERS, self.decode.in_size),
                (PROP_OUTPUT_BUFFERS, self.decode.out_size),
            ];
            for (property, size) in sizes {
                let Some(n) = size else { continue };
                if !instance.has_property(property) {
                    continue;
                }
                match instance.set_property(property, Value::from(n)) {
                    Ok(()) => debug!(node = %self.name, property, n, "decoder buffering changed"),
                    Err(e) => warn!(node = %self.name, property, error = %e, "cannot set decoder buffering"),
                }
            }
        }
        if active_mode {
            set_active_mode(instance, true);
        }
        if let Err(e) = instance.set_state(state) {
            warn!(node = %self.name, instance = instance.name(), error = %e, "couldn't sync state with parent");
        }
    }

    /// Feed the sticky events to a fresh instance; stops at the first
    /// event it rejects.
    fn replay_into(&self, path: &mut StreamPath, instance: &mut dyn DecoderElement) -> Result<()> {
        for event in path.sticky.replay() {
            let out = instance.sink_event(event)?;
            if let Err(e) = self.push_output(path, out) {
                debug!(node = %self.name, error = %e, "replayed output not delivered");
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Activation and swaps
    // ------------------------------------------------------------------

    /// Send an event upstream from the node's output.
    ///
    /// Activation signals are consumed here; everything else is reported
    /// as unhandled so the caller can forward it further upstream.
    pub fn send_upstream_event(&self, event: Event) -> Result<bool> {
        self.back.observe_event(&event);
        if let Some(request) = ActivationRequest::from_event(&event) {
            self.handle_activation(request)?;
            return Ok(true);
        }
        debug!(node = %self.name, event = event.name(), "upstream event not handled");
        Ok(false)
    }

    /// Apply an activation signal.
    ///
    /// Parameters are merged into the resource info. Before the stream
    /// type is known the flag is kept and applied on the first caps.
    /// Repeating the current target is a no-op.
    pub fn handle_activation(&self, request: ActivationRequest) -> Result<()> {
        let _span = span_node(&self.name).entered();
        let run_now = {
            let mut st = self.lock_state();
            match st.resource_info.as_mut() {
                Some(info) => info.merge(&request.params),
                None => st.resource_info = Some(ResourceInfo::new(&request.params)),
            }
            debug!(node = %self.name, params = %request.params, "got resource-info");

            match st.proxy_state {
                ProxyState::Unresolved => {
                    info!(node = %self.name, active = request.active, "stream type unknown, deferring activation");
                    st.pending_activation = Some(request.active);
                    return Ok(());
                }
                ProxyState::Failed => {
                    debug!(node = %self.name, "node failed, ignoring activation");
                    return Ok(());
                }
                ProxyState::PlaceholderActive | ProxyState::DecoderActive => {}
            }

            if st.target_active == request.active {
                debug!(node = %self.name, active = request.active, "activation unchanged");
                return Ok(());
            }
            st.target_active = request.active;
            st.stream_owner != Some(thread::current().id())
        };

        if run_now {
            self.run_pending_swaps();
        } else {
            debug!(node = %self.name, "activation from streaming thread, swap queued");
        }
        Ok(())
    }

    /// Run swaps until the linked instance matches the target.
    ///
    /// Returns immediately if another thread is already swapping or the
    /// caller holds the stream lock; that thread picks the target up.
    fn run_pending_swaps(&self) {
        loop {
            let (to_decoder, generation) = {
                let mut st = self.lock_state();
                if st.swapping
                    || st.stream_owner == Some(thread::current().id())
                    || !st.proxy_state.is_linked()
                    || st.target_active == st.applied_active
                {
                    return;
                }
                st.swapping = true;
                (st.target_active, st.generation)
            };

            info!(node = %self.name, to_decoder, "switching decoder");
            let result = self.swap(to_decoder);

            let mut st = self.lock_state();
            st.swapping = false;
            if st.generation != generation {
                debug!(node = %self.name, "node reset during swap");
                return;
            }
            match result {
                Ok(()) => st.applied_active = to_decoder,
                Err(e @ Error::PlaceholderUnavailable(_)) => {
                    error!(node = %self.name, error = %e, "no instance left to link");
                    st.target_active = to_decoder;
                    st.applied_active = to_decoder;
                    st.current_factory = None;
                    self.transition(&mut st, ProxyState::Failed);
                    self.bus
                        .post_error(&self.name, StreamErrorKind::Failed, format!("cannot replace decoder: {e}"));
                    return;
                }
                Err(e) => {
                    warn!(node = %self.name, error = %e, "swap aborted, keeping current instance");
                    self.metrics.record_swap_aborted();
                    st.target_active = st.applied_active;
                    return;
                }
            }
        }
    }

    fn swap(&self, to_decoder: bool) -> Result<()> {
        let span = span_swap(&self.name, to_decoder);
        let _enter = span.enter();
        let started = Instant::now();

        let gate = self
            .gate
            .install()
            .map_err(|e| Error::Swap(format!("cannot block input: {e}")))?;
        debug!(node = %self.name, "input blocked");

        let result = self.swap_locked(to_decoder);

        self.gate.remove(gate);
        debug!(node = %self.name, "input unblocked");
        if result.is_ok() {
            self.metrics.record_swap(to_decoder, started.elapsed());
        }
        result
    }

    fn swap_locked(&self, to_decoder: bool) -> Result<()> {
        let mut path = self.lock_stream();
        let (stream_type, resource_info, element_state) = {
            let st = self.lock_state();
            if !st.proxy_state.is_linked() {
                return Err(Error::Swap(format!("node is {}", st.proxy_state)));
            }
            (
                st.stream_type.unwrap_or(StreamType::Unknown),
                st.resource_info.clone(),
                st.element_state,
            )
        };

        let mut old = path
            .slot
            .take()
            .ok_or_else(|| Error::Swap("no linked instance".to_string()))?;
        let old_name = old.name().to_string();

        // Drain: whatever the old instance still holds goes downstream, its
        // EOS does not.
        debug!(node = %self.name, instance = %old_name, "draining");
        path.drain.arm();
        let drained = match old.sink_event(Event::Eos) {
            Ok(out) => out,
            Err(e) => {
                path.drain.disarm();
                path.slot = Some(old);
                return Err(Error::Swap(format!("{old_name} rejected EOS: {e}")));
            }
        };
        for item in drained {
            if let Some(item) = path.drain.filter(item) {
                if let Err(e) = self.push_downstream(&path, item) {
                    warn!(node = %self.name, error = %e, "drained item not delivered");
                }
            }
        }
        if !path.drain.fired() {
            path.drain.disarm();
            path.slot = Some(old);
            return Err(Error::Swap(format!("{old_name} did not forward EOS")));
        }

        debug!(node = %self.name, instance = %old_name, "drained, releasing");
        if let Err(e) = old.set_state(ElementState::Null) {
            debug!(node = %self.name, error = %e, "old instance did not shut down cleanly");
        }
        drop(old);

        let caps = path.sticky.caps.clone().unwrap_or_else(Caps::any);
        let trick = path.sticky.is_trick_mode();

        let mut linked = None;
        if to_decoder {
            match self.make_decoder(&caps) {
                Ok(mut decoder) => {
                    self.configure(decoder.as_mut(), true, resource_info.as_ref(), trick, element_state);
                    match self.replay_into(&mut path, decoder.as_mut()) {
                        Ok(()) => linked = Some(decoder),
                        Err(e) => {
                            warn!(node = %self.name, decoder = decoder.name(), error = %e, "decoder rejected stream");
                            if let Err(e) = decoder.set_state(ElementState::Null) {
                                debug!(node = %self.name, error = %e, "rejected decoder did not shut down cleanly");
                            }
                        }
                    }
                }
                Err(e) => {
                    self.metrics.record_resolution_failure();
                    info!(node = %self.name, error = %e, "failed to find proper decoder");
                }
            }
        }

        let real = linked.is_some();
        let degraded = to_decoder && !real;
        let instance = match linked {
            Some(decoder) => decoder,
            None => {
                let mut placeholder = if degraded {
                    self.degraded_placeholder(stream_type)?
                } else {
                    self.make_placeholder(stream_type)?
                };
                let keep_active = trick || (degraded && stream_type == StreamType::Audio);
                self.configure(placeholder.as_mut(), false, resource_info.as_ref(), keep_active, element_state);
                if let Err(e) = self.replay_into(&mut path, placeholder.as_mut()) {
                    warn!(node = %self.name, error = %e, "placeholder rejected stream");
                }
                placeholder
            }
        };

        let factory = instance.factory_name().to_string();
        path.slot = Some(instance);
        path.degraded = degraded && stream_type == StreamType::Audio;

        let mut st = self.lock_state();
        st.swap_count += 1;
        st.current_factory = Some(factory.clone());
        let to = if real {
            ProxyState::DecoderActive
        } else {
            ProxyState::PlaceholderActive
        };
        self.transition(&mut st, to);
        info!(node = %self.name, factory = %factory, "swap complete");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Change the element state.
    ///
    /// The linked instance follows. Going to Null releases it, drops the
    /// sticky events and returns the node to [`ProxyState::Unresolved`];
    /// granted resource parameters are kept.
    pub fn set_state(&self, state: ElementState) -> Result<()> {
        let _span = span_node(&self.name).entered();
        let from = std::mem::replace(&mut self.lock_state().element_state, state);
        debug!(node = %self.name, %from, to = %state, "element state change");

        if state == ElementState::Null {
            self.gate.set_flushing(true);
            let released = {
                let mut path = self.lock_stream();
                path.sticky.clear();
                path.drain.disarm();
                path.degraded = false;
                let released = path.slot.take();

                let mut st = self.lock_state();
                st.generation += 1;
                st.stream_type = None;
                st.pending_activation = None;
                st.target_active = false;
                st.applied_active = false;
                st.current_factory = None;
                self.transition(&mut st, ProxyState::Unresolved);
                released
            };
            if let Some(mut instance) = released {
                if let Err(e) = instance.set_state(ElementState::Null) {
                    debug!(node = %self.name, error = %e, "instance did not shut down cleanly");
                }
            }
            return Ok(());
        }

        if from == ElementState::Null {
            self.gate.set_flushing(false);
        }
        let mut path = self.lock_stream();
        if let Some(instance) = path.slot.as_mut() {
            instance.set_state(state)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current proxy state.
    pub fn state(&self) -> ProxyState {
        self.lock_state().proxy_state
    }

    /// Current element state.
    pub fn element_state(&self) -> ElementState {
        self.lock_state().element_state
    }

    /// Stream type, once classified.
    pub fn stream_type(&self) -> Option<StreamType> {
        self.lock_state().stream_type
    }

    /// Accumulated resource parameters.
    pub fn resource_info(&self) -> Option<ResourceInfo> {
        self.lock_state().resource_info.clone()
    }

    /// Completed swaps since creation.
    pub fn swap_count(&self) -> u64 {
        self.lock_state().swap_count
    }

    /// Factory of the linked instance.
    pub fn current_factory(&self) -> Option<String> {
        self.lock_state().current_factory.clone()
    }

    /// Whether a real decoder has been requested.
    pub fn target_active(&self) -> bool {
        self.lock_state().target_active
    }

    /// Counters of the input stage.
    pub fn front_stats(&self) -> IdentityStats {
        self.front.stats()
    }

    /// Counters of the output stage.
    pub fn back_stats(&self) -> IdentityStats {
        self.back.stats()
    }

    /// Whether input is currently parked by a swap.
    pub fn is_blocked(&self) -> bool {
        self.gate.is_blocking()
    }

    /// Number of threads parked at the input.
    pub fn parked(&self) -> usize {
        self.gate.parked()
    }
}

impl fmt::Debug for ProxyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.lock_state();
        f.debug_struct("ProxyNode")
            .field("name", &self.name)
            .field("state", &st.proxy_state)
            .field("stream_type", &st.stream_type)
            .field("current_factory", &st.current_factory)
            .field("swap_count", &st.swap_count)
            .finish()
    }
}

impl Drop for ProxyNode {
    fn drop(&mut self) {
        let path = self.stream.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut instance) = path.slot.take() {
            if let Err(e) = instance.set_state(ElementState::Null) {
                debug!(node = %self.name, error = %e, "instance did not shut down cleanly");
            }
        }
        path.downstream = None;
    }
}

fn set_active_mode(instance: &mut dyn DecoderElement, active: bool) {
    if !instance.has_property(PROP_ACTIVE_MODE) {
        return;
    }
    if let Err(e) = instance.set_property(PROP_ACTIVE_MODE, Value::Bool(active)) {
        warn!(instance = instance.name(), error = %e, "cannot set active-mode");
    }
}
