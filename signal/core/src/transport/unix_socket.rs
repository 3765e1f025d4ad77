//! Unix Socket Signal Channel
//!
//! Listens on a Unix domain socket at a caller-provided path or at a
//! generated path in the system temp directory.
//!
//! # Socket File
//!
//! - An existing file at the path is never removed; binding fails with
//!   `AddrInUse` instead
//! - The socket file this channel created is removed before `Closed` is
//!   emitted, so the same path can be bound again afterwards

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::net::{UnixListener, UnixStream};
use url::Url;

use super::lifecycle::{spawn_listener, Acceptor, Lifecycle};
use super::traits::{ChannelState, SignalChannel};
use crate::address::{random_socket_path, resolve_socket_path, resolve_socket_url, SignalAddress};
use crate::config::ChannelConfig;
use crate::error::SignalError;
use crate::events::SignalEvents;

/// Signal channel on a Unix domain socket
///
/// Dropping the handle closes the channel.
pub struct UnixSignal {
    path: PathBuf,
    lifecycle: Arc<Lifecycle>,
}

impl UnixSignal {
    /// Start listening at `address`, or at a random temp path if `None`
    ///
    /// `address` may be an absolute path or a URI whose path component is
    /// absolute (`unix:///tmp/x.sock`). Binding happens in the background;
    /// await [`SignalChannel::ready`] to observe its outcome. The returned
    /// receiver sees every event, starting with `Listening`.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::InvalidAddress`] if `address` is neither an
    /// absolute path nor such a URI. Nothing is bound in that case.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(
        address: Option<&str>,
        config: ChannelConfig,
    ) -> Result<(Self, SignalEvents), SignalError> {
        let path = resolve_socket_path(address)?;
        Ok(Self::listen(path, config))
    }

    /// Start listening at the path component of `url`
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::InvalidAddress`] if the URI has no absolute path.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn from_url(url: &Url, config: ChannelConfig) -> Result<(Self, SignalEvents), SignalError> {
        let path = resolve_socket_url(url)?;
        Ok(Self::listen(path, config))
    }

    /// Start listening at a freshly generated temp path
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn random(config: ChannelConfig) -> (Self, SignalEvents) {
        Self::listen(random_socket_path(), config)
    }

    fn listen(path: PathBuf, config: ChannelConfig) -> (Self, SignalEvents) {
        let lifecycle = Lifecycle::new(SignalAddress::Unix(path.clone()), "unix", config);
        let events = lifecycle.subscribe();

        let bind_path = path.clone();
        spawn_listener(Arc::clone(&lifecycle), async move {
            BoundSocket::bind(bind_path)
        });

        (Self { path, lifecycle }, events)
    }

    /// Path of the socket file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SignalChannel for UnixSignal {
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

impl Drop for UnixSignal {
    fn drop(&mut self) {
        self.lifecycle.request_close();
    }
}

/// A bound listener together with the socket file it created
struct BoundSocket {
    listener: UnixListener,
    path: PathBuf,
}

impl BoundSocket {
    fn bind(path: PathBuf) -> io::Result<Self> {
        let listener = UnixListener::bind(&path)?;
        tracing::debug!(path = ?path, "Bound Unix signal socket");
        Ok(Self { listener, path })
    }
}

impl Acceptor for BoundSocket {
    type Stream = UnixStream;

    fn poll_accept(&self, cx: &mut Context<'_>) -> Poll<io::Result<UnixStream>> {
        self.listener
            .poll_accept(cx)
            .map_ok(|(stream, _addr)| stream)
    }

    fn release(self) {
        drop(self.listener);

        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = ?self.path, "Removed signal socket"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Failed to remove signal socket");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_invalid_address_is_synchronous() {
        let result = UnixSignal::new(Some("not a path or uri"), ChannelConfig::default());
        assert!(matches!(result, Err(SignalError::InvalidAddress { .. })));
    }

    #[tokio::test]
    async fn test_socket_file_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("signal.sock");

        let (signal, _events) =
            UnixSignal::new(socket_path.to_str(), ChannelConfig::default()).unwrap();
        assert_eq!(signal.path(), socket_path.as_path());
        assert_eq!(signal.state(), ChannelState::Binding);

        signal.ready().await.unwrap();
        assert!(socket_path.exists());

        signal.close();
        signal.closed().await;
        assert!(!socket_path.exists());
    }

    #[tokio::test]
    async fn test_from_url() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("url.sock");
        let url = Url::parse(&format!("unix://{}", socket_path.display())).unwrap();

        let (signal, _events) = UnixSignal::from_url(&url, ChannelConfig::default()).unwrap();
        assert_eq!(signal.path(), socket_path.as_path());
        signal.ready().await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_closes_channel() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("drop.sock");

        let (signal, mut events) =
            UnixSignal::new(socket_path.to_str(), ChannelConfig::default()).unwrap();
        signal.ready().await.unwrap();
        drop(signal);

        while let Some(event) = events.recv().await {
            if event.is_terminal() {
                break;
            }
        }
        assert!(!socket_path.exists());
    }
}
