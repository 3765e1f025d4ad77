//! Signal Channel Events
//!
//! Everything a channel reports after construction is delivered as a
//! [`SignalEvent`] on a [`SignalEvents`] receiver.
//!
//! # Ordering
//!
//! ```text
//! Listening ─┬─► Connect(c1) ─► Received(c1)* ─► ConnectionClosed(c1) ─┬─► Closed
//!            └─► Connect(c2) ─► Received(c2)* ─► ConnectionClosed(c2) ─┘
//! ```
//!
//! - `Listening` precedes every connection event
//! - events for one connection are never reordered
//! - events of different connections interleave freely
//! - `Closed` is the last event; the receiver ends right after it
//!
//! A failed bind produces `Error` followed by `Closed` instead.

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::error::SignalError;

/// Opaque handle for one accepted connection
///
/// Unique within the process; never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate a new unique connection ID
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw numeric value
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// An event emitted by a signal channel
#[derive(Clone, Debug)]
pub enum SignalEvent {
    /// The listener is bound and accepting connections
    Listening {
        /// URL peers should connect to
        url: String,
    },

    /// A bind, listener or connection fault
    Error(SignalError),

    /// A peer connected
    Connect(ConnectionId),

    /// A chunk of data arrived on a connection
    Received {
        /// The connection the chunk arrived on
        connection: ConnectionId,
        /// The chunk, decoded as UTF-8 (invalid sequences replaced)
        payload: String,
    },

    /// A peer disconnected
    ConnectionClosed(ConnectionId),

    /// The listener stopped; no further events follow
    Closed,
}

impl SignalEvent {
    /// Stable name of the event kind, used in diagnostic output
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Listening { .. } => "Signal.listening",
            Self::Error(_) => "Signal.error",
            Self::Connect(_) => "Signal.Socket.connect",
            Self::Received { .. } => "Signal.received",
            Self::ConnectionClosed(_) => "Signal.Socket.closed",
            Self::Closed => "Signal.closed",
        }
    }

    /// The connection this event belongs to, if any
    #[must_use]
    pub fn connection(&self) -> Option<ConnectionId> {
        match self {
            Self::Connect(id) | Self::ConnectionClosed(id) => Some(*id),
            Self::Received { connection, .. } => Some(*connection),
            Self::Error(SignalError::ConnectionError { connection, .. }) => Some(*connection),
            _ => None,
        }
    }

    /// Whether this is the final event of the channel
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for SignalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listening { url } => write!(f, "{} {url}", self.name()),
            Self::Error(err) => write!(f, "{} {err}", self.name()),
            Self::Connect(id) | Self::ConnectionClosed(id) => write!(f, "{} {id}", self.name()),
            Self::Received {
                connection,
                payload,
            } => write!(f, "{} {connection} {payload:?}", self.name()),
            Self::Closed => f.write_str(self.name()),
        }
    }
}

/// Receiving side of a channel's event stream
///
/// Yields events in emission order and ends after [`SignalEvent::Closed`].
/// Also usable as a [`futures::Stream`].
#[derive(Debug)]
pub struct SignalEvents {
    rx: mpsc::UnboundedReceiver<SignalEvent>,
}

impl SignalEvents {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<SignalEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next event
    ///
    /// Returns `None` once the channel has closed and all events were read.
    pub async fn recv(&mut self) -> Option<SignalEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is already queued
    pub fn try_recv(&mut self) -> Option<SignalEvent> {
        self.rx.try_recv().ok()
    }
}

impl Stream for SignalEvents {
    type Item = SignalEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_ids_are_unique() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
        assert_eq!(a.to_string(), format!("conn-{}", a.as_u64()));
    }

    #[test]
    fn test_event_names() {
        let id = ConnectionId::new();
        assert_eq!(SignalEvent::Connect(id).name(), "Signal.Socket.connect");
        assert_eq!(SignalEvent::ConnectionClosed(id).name(), "Signal.Socket.closed");
        assert_eq!(SignalEvent::Closed.name(), "Signal.closed");
        assert!(SignalEvent::Closed.is_terminal());
    }

    #[test]
    fn test_event_connection() {
        let id = ConnectionId::new();
        let received = SignalEvent::Received {
            connection: id,
            payload: "ping".into(),
        };
        assert_eq!(received.connection(), Some(id));
        assert_eq!(received.to_string(), format!("Signal.received {id} \"ping\""));
        assert_eq!(SignalEvent::Closed.connection(), None);
    }

    #[tokio::test]
    async fn test_events_end_when_sender_dropped() {
        use futures::StreamExt;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut events = SignalEvents::new(rx);

        tx.send(SignalEvent::Closed).unwrap();
        drop(tx);

        assert!(matches!(events.next().await, Some(SignalEvent::Closed)));
        assert!(events.next().await.is_none());
    }
}
