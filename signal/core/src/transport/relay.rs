//! Connection Relay
//!
//! Turns one accepted stream into `Received` events. The accept loop emits
//! `Connect` before spawning the relay, and the relay emits
//! `ConnectionClosed` as its very last action, so the per-connection order
//! holds no matter how relays of different connections interleave.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};

use super::lifecycle::{shutdown_requested, Lifecycle};
use crate::error::SignalError;
use crate::events::{ConnectionId, SignalEvent};

/// Size of the read buffer; one read becomes one `Received` event
const READ_CHUNK: usize = 64 * 1024;

/// Relay a connection until the peer disconnects or the channel shuts down
pub(crate) async fn relay_connection<S>(
    lifecycle: Arc<Lifecycle>,
    connection: ConnectionId,
    mut stream: S,
) where
    S: AsyncRead + Unpin + Send,
{
    let mut shutdown = lifecycle.shutdown_signal();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        tokio::select! {
            biased;
            () = shutdown_requested(&mut shutdown) => {
                tracing::debug!(conn_id = %connection, "Dropping connection on shutdown");
                break;
            }
            read = stream.read(&mut buf) => match read {
                Ok(0) => {
                    tracing::debug!(conn_id = %connection, "Connection closed by peer");
                    break;
                }
                Ok(n) => {
                    let payload = String::from_utf8_lossy(&buf[..n]).into_owned();
                    lifecycle.emit(SignalEvent::Received { connection, payload });
                }
                Err(e) => {
                    tracing::warn!(conn_id = %connection, error = %e, "Read error");
                    lifecycle.emit(SignalEvent::Error(SignalError::connection(connection, e)));
                    break;
                }
            },
        }
    }

    drop(stream);
    lifecycle.emit(SignalEvent::ConnectionClosed(connection));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::SignalAddress;
    use crate::config::ChannelConfig;
    use tokio::io::AsyncWriteExt;

    fn lifecycle() -> Arc<Lifecycle> {
        Lifecycle::new(SignalAddress::Tcp { port: 1 }, "test", ChannelConfig::default())
    }

    #[tokio::test]
    async fn test_relay_orders_chunks() {
        let lifecycle = lifecycle();
        let mut events = lifecycle.subscribe();
        let connection = ConnectionId::new();

        let (mut peer, stream) = tokio::io::duplex(64);
        let relay = tokio::spawn(relay_connection(Arc::clone(&lifecycle), connection, stream));

        peer.write_all(b"first").await.unwrap();
        match events.recv().await {
            Some(SignalEvent::Received { payload, .. }) => assert_eq!(payload, "first"),
            other => panic!("unexpected event: {other:?}"),
        }

        peer.write_all(b"second").await.unwrap();
        match events.recv().await {
            Some(SignalEvent::Received { payload, .. }) => assert_eq!(payload, "second"),
            other => panic!("unexpected event: {other:?}"),
        }

        drop(peer);
        relay.await.unwrap();
        assert!(
            matches!(events.recv().await, Some(SignalEvent::ConnectionClosed(id)) if id == connection)
        );
    }

    #[tokio::test]
    async fn test_relay_decodes_lossy() {
        let lifecycle = lifecycle();
        let mut events = lifecycle.subscribe();

        let (mut peer, stream) = tokio::io::duplex(64);
        let relay = tokio::spawn(relay_connection(
            Arc::clone(&lifecycle),
            ConnectionId::new(),
            stream,
        ));

        peer.write_all(&[b'o', b'k', 0xff]).await.unwrap();
        drop(peer);
        relay.await.unwrap();

        match events.recv().await {
            Some(SignalEvent::Received { payload, .. }) => assert_eq!(payload, "ok\u{fffd}"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_relay_stops_on_shutdown() {
        let lifecycle = lifecycle();
        let mut events = lifecycle.subscribe();
        let connection = ConnectionId::new();

        let (_peer, stream) = tokio::io::duplex(64);
        let relay = tokio::spawn(relay_connection(Arc::clone(&lifecycle), connection, stream));

        lifecycle.request_close();
        relay.await.unwrap();

        assert!(
            matches!(events.recv().await, Some(SignalEvent::ConnectionClosed(id)) if id == connection)
        );
    }
}
