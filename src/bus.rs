//! Application message bus.
//!
//! Proxy nodes post out-of-band notifications here: media info records,
//! degraded-stream warnings, fatal stream errors and state changes.
//! Messages can be received asynchronously by any number of subscribers.

use crate::decproxy::ProxyState;
use crate::format::Structure;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::broadcast;

/// Category of a stream warning or error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamErrorKind {
    /// No decoder can handle the stream.
    CodecNotFound,
    /// Generic stream failure.
    Failed,
    /// Formats could not be negotiated.
    NotNegotiated,
}

impl fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamErrorKind::CodecNotFound => "codec-not-found",
            StreamErrorKind::Failed => "failed",
            StreamErrorKind::NotNegotiated => "not-negotiated",
        };
        f.write_str(s)
    }
}

/// Messages posted on the bus.
#[derive(Debug, Clone)]
pub enum Message {
    /// A stream description for the application.
    MediaInfo {
        /// Posting node.
        source: String,
        /// The media info record.
        record: Structure,
    },

    /// The stream keeps flowing, but degraded.
    Warning {
        /// Posting node.
        source: String,
        /// Category.
        kind: StreamErrorKind,
        /// Human-readable text.
        text: String,
    },

    /// The stream cannot continue.
    Error {
        /// Posting node.
        source: String,
        /// Category.
        kind: StreamErrorKind,
        /// Human-readable text.
        text: String,
    },

    /// A proxy node changed state.
    StateChanged {
        /// Posting node.
        source: String,
        /// Previous state.
        from: ProxyState,
        /// New state.
        to: ProxyState,
    },
}

impl Message {
    /// Name of the node that posted the message.
    pub fn source(&self) -> &str {
        match self {
            Message::MediaInfo { source, .. }
            | Message::Warning { source, .. }
            | Message::Error { source, .. }
            | Message::StateChanged { source, .. } => source,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::MediaInfo { source, record } => write!(f, "MediaInfo from {source}: {record}"),
            Message::Warning { source, kind, text } => {
                write!(f, "Warning in {source} ({kind}): {text}")
            }
            Message::Error { source, kind, text } => {
                write!(f, "Error in {source} ({kind}): {text}")
            }
            Message::StateChanged { source, from, to } => {
                write!(f, "StateChanged in {source}: {from:?} -> {to:?}")
            }
        }
    }
}

/// Sending side of the bus.
///
/// Cheap to clone; every proxy node holds one.
#[derive(Clone)]
pub struct Bus {
    sender: broadcast::Sender<Message>,
}

impl Bus {
    /// Create a new bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Post a message.
    ///
    /// Returns the number of subscribers that received it; 0 if there are
    /// none (which is fine).
    pub fn post(&self, message: Message) -> usize {
        tracing::trace!(%message, "bus post");
        self.sender.send(message).unwrap_or(0)
    }

    /// Post a warning.
    pub fn post_warning(&self, source: &str, kind: StreamErrorKind, text: impl Into<String>) {
        self.post(Message::Warning {
            source: source.to_string(),
            kind,
            text: text.into(),
        });
    }

    /// Post an error.
    pub fn post_error(&self, source: &str, kind: StreamErrorKind, text: impl Into<String>) {
        self.post(Message::Error {
            source: source.to_string(),
            kind,
            text: text.into(),
        });
    }

    /// Create a receiver.
    pub fn subscribe(&self) -> BusReceiver {
        BusReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Create a stream of messages.
    pub fn stream(&self) -> BusStream {
        BusStream::new(self.subscribe())
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

/// Receiving side of the bus.
pub struct BusReceiver {
    receiver: broadcast::Receiver<Message>,
}

impl BusReceiver {
    /// Receive the next message.
    ///
    /// Returns `None` once every sender has been dropped.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!(skipped = n, "bus receiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&mut self) -> Option<Message> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => return Some(message),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Drain every pending message.
    pub fn drain(&mut self) -> Vec<Message> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// A stream adapter over a [`BusReceiver`].
pub struct BusStream {
    inner: BoxStream<'static, Message>,
}

impl BusStream {
    /// Create a new stream from a receiver.
    pub fn new(receiver: BusReceiver) -> Self {
        let inner = stream::unfold(receiver, |mut receiver| async move {
            let message = receiver.recv().await?;
            Some((message, receiver))
        });
        Self {
            inner: inner.boxed(),
        }
    }
}

impl Stream for BusStream {
    type Item = Message;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}
