//! Signal Channel Errors
//!
//! A single error type covers every failure a channel can report. Only
//! [`SignalError::InvalidAddress`] is returned synchronously from a
//! constructor; everything else arrives through the readiness future or as a
//! [`SignalEvent::Error`](crate::events::SignalEvent::Error).
//!
//! The type is `Clone` so the same failure can be fanned out to every event
//! subscriber and to every caller awaiting readiness. Underlying I/O errors
//! are therefore shared behind an `Arc`.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::events::ConnectionId;

/// Errors produced by signal channels
#[derive(Debug, Clone, Error)]
pub enum SignalError {
    /// The local-socket address is neither an absolute path nor a URI with
    /// an absolute path component
    #[error("Invalid UNIX path: {input}")]
    InvalidAddress {
        /// The offending input, verbatim
        input: String,
    },

    /// The OS refused to bind the listener
    #[error("Failed to bind {address}: {source}")]
    BindFailure {
        /// URL of the address that could not be bound
        address: String,
        /// Underlying OS error
        #[source]
        source: Arc<io::Error>,
    },

    /// A single accepted connection faulted; the listener is unaffected
    #[error("Connection {connection} failed: {source}")]
    ConnectionError {
        /// The connection that faulted
        connection: ConnectionId,
        /// Underlying OS error
        #[source]
        source: Arc<io::Error>,
    },

    /// The listener faulted after binding and has stopped
    #[error("Listener on {address} failed: {source}")]
    ListenerFailure {
        /// URL of the failed listener
        address: String,
        /// Underlying OS error
        #[source]
        source: Arc<io::Error>,
    },

    /// The channel was closed before it started listening
    #[error("Signal channel closed")]
    Closed,
}

impl SignalError {
    pub(crate) fn bind(address: impl Into<String>, source: io::Error) -> Self {
        Self::BindFailure {
            address: address.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn connection(connection: ConnectionId, source: io::Error) -> Self {
        Self::ConnectionError {
            connection,
            source: Arc::new(source),
        }
    }

    pub(crate) fn listener(address: impl Into<String>, source: io::Error) -> Self {
        Self::ListenerFailure {
            address: address.into(),
            source: Arc::new(source),
        }
    }

    /// The underlying OS error, if this failure carries one
    #[must_use]
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::BindFailure { source, .. }
            | Self::ConnectionError { source, .. }
            | Self::ListenerFailure { source, .. } => Some(source.as_ref()),
            Self::InvalidAddress { .. } | Self::Closed => None,
        }
    }

    /// Whether this error ends the channel (as opposed to a single connection)
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ConnectionError { .. } | Self::InvalidAddress { .. })
    }
}
