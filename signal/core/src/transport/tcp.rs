//! TCP Signal Channel
//!
//! Listens on a caller-chosen port of the loopback interface. Never
//! reachable from other hosts.
//!
//! Port problems (out of range, already bound) are reported the same way as
//! any other bind failure: readiness rejects and an `Error` event fires.
//! Port 0 is refused as well, since the channel advertises its URL before
//! the OS would have picked a port.

use std::io;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};

use super::lifecycle::{spawn_listener, Acceptor, Lifecycle};
use super::traits::{ChannelState, SignalChannel};
use crate::address::{SignalAddress, LOOPBACK};
use crate::config::ChannelConfig;
use crate::error::SignalError;
use crate::events::SignalEvents;

/// Signal channel on a loopback TCP port
///
/// Dropping the handle closes the channel.
pub struct TcpSignal {
    port: u32,
    lifecycle: Arc<Lifecycle>,
}

impl TcpSignal {
    /// Start listening on `127.0.0.1:port`
    ///
    /// Never fails synchronously; await [`SignalChannel::ready`] to learn
    /// whether the port could be bound.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn new(port: u32, config: ChannelConfig) -> (Self, SignalEvents) {
        let lifecycle = Lifecycle::new(SignalAddress::Tcp { port }, "tcp", config);
        let events = lifecycle.subscribe();

        spawn_listener(Arc::clone(&lifecycle), async move {
            let port = validate_port(port)?;
            let listener = TcpListener::bind((LOOPBACK, port)).await?;
            tracing::debug!(port, "Bound TCP signal socket");
            Ok::<_, io::Error>(listener)
        });

        (Self { port, lifecycle }, events)
    }

    /// The requested TCP port
    pub fn port(&self) -> u32 {
        self.port
    }
}

#[async_trait]
impl SignalChannel for TcpSignal {
    fn address(&self) -> &SignalAddress {
        self.lifecycle.address()
    }

    fn state(&self) -> ChannelState {
        self.lifecycle.state()
    }

    async fn ready(&self) -> Result<(), SignalError> {
        self.lifecycle.ready().await
    }

    fn subscribe(&self) -> SignalEvents {
        self.lifecycle.subscribe()
    }

    fn close(&self) {
        self.lifecycle.request_close();
    }

    async fn closed(&self) {
        self.lifecycle.closed().await;
    }
}

impl Drop for TcpSignal {
    fn drop(&mut self) {
        self.lifecycle.request_close();
    }
}

impl Acceptor for TcpListener {
    type Stream = TcpStream;

    fn poll_accept(&self, cx: &mut Context<'_>) -> Poll<io::Result<TcpStream>> {
        TcpListener::poll_accept(self, cx).map_ok(|(stream, _addr)| stream)
    }
}

fn validate_port(port: u32) -> io::Result<u16> {
    match u16::try_from(port) {
        Ok(0) => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "port 0 is not supported; an explicit port is required",
        )),
        Ok(port) => Ok(port),
        Err(_) => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("port {port} is out of range"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_port() {
        assert_eq!(validate_port(6499).unwrap(), 6499);
        assert_eq!(validate_port(65535).unwrap(), 65535);
        assert_eq!(
            validate_port(0).unwrap_err().kind(),
            io::ErrorKind::InvalidInput
        );
        assert_eq!(
            validate_port(70_000).unwrap_err().kind(),
            io::ErrorKind::InvalidInput
        );
    }

    #[tokio::test]
    async fn test_out_of_range_port_rejects_readiness() {
        let (signal, mut events) = TcpSignal::new(70_000, ChannelConfig::default());
        assert_eq!(signal.url(), "tcp://127.0.0.1:70000");

        let err = signal.ready().await.unwrap_err();
        assert_eq!(
            err.io_error().map(io::Error::kind),
            Some(io::ErrorKind::InvalidInput)
        );

        assert!(matches!(events.recv().await, Some(crate::SignalEvent::Error(_))));
        assert!(matches!(events.recv().await, Some(crate::SignalEvent::Closed)));
        assert_eq!(signal.state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn test_port_zero_is_refused() {
        let (signal, _events) = TcpSignal::new(0, ChannelConfig::default());
        assert!(matches!(
            signal.ready().await,
            Err(SignalError::BindFailure { .. })
        ));
    }
}
