//! Signal relay loop
//!
//! Writes each received payload as one line and keeps going until the
//! channel closes. A shutdown request closes the channel, after which the
//! loop drains the remaining events up to `Closed`.

use std::future::Future;
use std::io::Write;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use signal_core::{SignalChannel, SignalEvent, SignalEvents};

/// How the relay loop behaves
#[derive(Clone, Copy, Debug, Default)]
pub struct ListenOptions {
    /// Close the channel after the first received signal
    pub once: bool,
}

/// Relay signals to `out` until the channel closes
///
/// Returns the number of payloads written.
pub async fn run<W, F>(
    channel: &dyn SignalChannel,
    events: &mut SignalEvents,
    options: ListenOptions,
    out: &mut W,
    shutdown: F,
) -> Result<usize>
where
    W: Write,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut shutdown_done = false;
    let mut received = 0;

    loop {
        tokio::select! {
            () = &mut shutdown, if !shutdown_done => {
                shutdown_done = true;
                channel.close();
            }
            event = events.recv() => match event {
                Some(SignalEvent::Received { connection, payload }) => {
                    debug!(conn_id = %connection, bytes = payload.len(), "Signal received");
                    writeln!(out, "{payload}").context("Failed to write signal")?;
                    out.flush().context("Failed to flush output")?;
                    received += 1;
                    if options.once {
                        channel.close();
                    }
                }
                Some(SignalEvent::Connect(connection)) => {
                    debug!(conn_id = %connection, "Peer connected");
                }
                Some(SignalEvent::ConnectionClosed(connection)) => {
                    debug!(conn_id = %connection, "Peer disconnected");
                }
                Some(SignalEvent::Listening { url }) => {
                    debug!(url = %url, "Channel listening");
                }
                Some(SignalEvent::Error(e)) => {
                    warn!(error = %e, "Signal channel error");
                }
                Some(SignalEvent::Closed) | None => {
                    info!(url = %channel.url(), "Signal channel closed");
                    break;
                }
            },
        }
    }

    Ok(received)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use signal_core::{ChannelConfig, UnixSignal};
    use tokio::io::AsyncWriteExt;
    use tokio::net::UnixStream;

    #[tokio::test]
    async fn test_run_once_prints_first_signal() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("listen.sock");
        let (signal, mut events) =
            UnixSignal::new(socket_path.to_str(), ChannelConfig::default()).unwrap();
        signal.ready().await.unwrap();

        let peer_path = socket_path.clone();
        let peer = tokio::spawn(async move {
            let mut stream = UnixStream::connect(&peer_path).await.unwrap();
            stream.write_all(b"ping").await.unwrap();
            stream
        });

        let mut out = Vec::new();
        let received = run(
            &signal,
            &mut events,
            ListenOptions { once: true },
            &mut out,
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(received, 1);
        assert_eq!(String::from_utf8(out).unwrap(), "ping\n");
        assert!(!socket_path.exists());
        drop(peer.await.unwrap());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (signal, mut events) = UnixSignal::random(ChannelConfig::default());
        signal.ready().await.unwrap();

        let mut out = Vec::new();
        let received = run(
            &signal,
            &mut events,
            ListenOptions::default(),
            &mut out,
            async {},
        )
        .await
        .unwrap();

        assert_eq!(received, 0);
        assert!(out.is_empty());
        assert!(!signal.path().exists());
    }
}
