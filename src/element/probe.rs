//! Pad probes: interceptors installed on a link at runtime.
//!
//! - [`BlockingProbe`] parks every thread that tries to push through the
//!   link until the probe is removed.
//! - [`DrainProbe`] is a one-shot filter that swallows the next `Eos` and
//!   lets everything else through.
//!
//! Together they implement "block, drain, replace, unblock" for swapping
//! an element inside a running pipeline.

use crate::error::{Error, Result};
use crate::event::PipelineItem;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Handle returned when a probe is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeId(u64);

#[derive(Debug, Default)]
struct BlockingInner {
    next_id: u64,
    active: Option<ProbeId>,
    flushing: bool,
    parked: usize,
}

/// A blocking interceptor on a link.
///
/// Streaming threads call [`wait_open`](Self::wait_open) before pushing.
/// While a probe is installed they park there; removing the probe wakes
/// them all. Flushing wakes them with [`Error::Flushing`].
///
/// # Example
///
/// ```rust
/// use decproxy::element::BlockingProbe;
///
/// let probe = BlockingProbe::new();
/// let id = probe.install().unwrap();
/// assert!(probe.is_blocking());
/// assert!(probe.remove(id));
/// assert!(probe.wait_open().is_ok());
/// ```
#[derive(Debug, Default)]
pub struct BlockingProbe {
    inner: Mutex<BlockingInner>,
    cond: Condvar,
}

impl BlockingProbe {
    /// Create an open probe point.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BlockingInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install the blocking probe.
    ///
    /// Fails while flushing, or if a probe is already installed.
    pub fn install(&self) -> Result<ProbeId> {
        let mut inner = self.lock();
        if inner.flushing {
            return Err(Error::Flushing);
        }
        if inner.active.is_some() {
            return Err(Error::Swap("blocking probe already installed".into()));
        }
        inner.next_id += 1;
        let id = ProbeId(inner.next_id);
        inner.active = Some(id);
        Ok(id)
    }

    /// Remove the probe and release all parked threads.
    ///
    /// Returns `false` if `id` is not the installed probe.
    pub fn remove(&self, id: ProbeId) -> bool {
        let mut inner = self.lock();
        if inner.active != Some(id) {
            return false;
        }
        inner.active = None;
        drop(inner);
        self.cond.notify_all();
        true
    }

    /// Block the calling thread until no probe is installed.
    pub fn wait_open(&self) -> Result<()> {
        let mut inner = self.lock();
        while inner.active.is_some() && !inner.flushing {
            inner.parked += 1;
            tracing::trace!(parked = inner.parked, "streaming thread blocked by probe");
            inner = self
                .cond
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
            inner.parked -= 1;
        }
        if inner.flushing {
            return Err(Error::Flushing);
        }
        Ok(())
    }

    /// Enter or leave flushing.
    ///
    /// Entering wakes all parked threads with an error.
    pub fn set_flushing(&self, flushing: bool) {
        let mut inner = self.lock();
        inner.flushing = flushing;
        if flushing {
            inner.active = None;
        }
        drop(inner);
        self.cond.notify_all();
    }

    /// Whether the probe point is flushing.
    pub fn is_flushing(&self) -> bool {
        self.lock().flushing
    }

    /// Whether a blocking probe is installed.
    pub fn is_blocking(&self) -> bool {
        self.lock().active.is_some()
    }

    /// Number of threads currently parked.
    pub fn parked(&self) -> usize {
        self.lock().parked
    }
}

/// A one-shot interceptor that fires on end-of-stream.
///
/// Once armed, the first `Eos` passed to [`filter`](Self::filter) is
/// swallowed and the probe records that it fired. Ordinary data is
/// passed through untouched.
#[derive(Debug, Default)]
pub struct DrainProbe {
    armed: bool,
    fired: bool,
}

impl DrainProbe {
    /// Create a disarmed probe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the probe for the next `Eos`.
    pub fn arm(&mut self) {
        self.armed = true;
        self.fired = false;
    }

    /// Disarm without firing.
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Whether the probe is waiting for `Eos`.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Whether the probe saw its `Eos`.
    pub fn fired(&self) -> bool {
        self.fired
    }

    /// Filter one item; returns `None` if it was the awaited `Eos`.
    pub fn filter(&mut self, item: PipelineItem) -> Option<PipelineItem> {
        if self.armed && item.is_eos() {
            self.armed = false;
            self.fired = true;
            return None;
        }
        Some(item)
    }
}
