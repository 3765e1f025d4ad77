//! Signal Listener
//!
//! Opens a signal channel and prints every signal a peer delivers to it.
//! The channel URL is printed first, so a supervising script can read one
//! line and hand it to the process that will send signals.
//!
//! # Usage
//!
//! ```bash
//! # Unix socket at a random temp path
//! signal-listen
//!
//! # Unix socket at a fixed path, exit after the first signal
//! signal-listen --unix /tmp/debugger.sock --once
//!
//! # Loopback TCP
//! signal-listen --port 6499
//!
//! # Log every channel event
//! SIGNAL_DEBUG=1 signal-listen
//! ```
//!
//! # Environment Variables
//!
//! - `SIGNAL_DEBUG`: Log every emitted channel event
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//!
//! # Signals
//!
//! - SIGTERM/SIGINT: Close the channel and exit once it has shut down

mod listen;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use signal_core::{open_channel, ChannelConfig, TransportType};

use crate::listen::ListenOptions;

/// Listen for fire-and-forget signals on a Unix socket or loopback TCP port
#[derive(Debug, Parser)]
#[command(name = "signal-listen", version, about)]
struct Args {
    /// Unix socket path or URI (random temp path when given without a value)
    #[arg(
        long,
        value_name = "ADDRESS",
        num_args = 0..=1,
        default_missing_value = "",
        conflicts_with = "port"
    )]
    unix: Option<String>,

    /// Loopback TCP port to listen on
    #[arg(long, value_name = "PORT")]
    port: Option<u32>,

    /// Exit after the first signal
    #[arg(long)]
    once: bool,
}

impl Args {
    fn transport(&self) -> Result<TransportType> {
        match self.port {
            Some(port) => Ok(TransportType::tcp(port)),
            None => local_transport(self.unix.clone().filter(|a| !a.is_empty())),
        }
    }
}

#[cfg(unix)]
#[allow(clippy::unnecessary_wraps)]
fn local_transport(address: Option<String>) -> Result<TransportType> {
    Ok(TransportType::UnixSocket { address })
}

#[cfg(not(unix))]
fn local_transport(_address: Option<String>) -> Result<TransportType> {
    anyhow::bail!("Unix sockets are not available on this platform; use --port")
}

/// Resolves when SIGINT or SIGTERM arrives
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the URL and the signals
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("signal_listen=info".parse()?)
                .add_directive("signal_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args = Args::parse();
    let transport = args.transport()?;

    // Read once for the whole process
    let config = ChannelConfig::process_default();

    let (channel, mut events) =
        open_channel(&transport, config).context("Failed to open signal channel")?;

    if let Err(e) = channel.ready().await {
        error!(url = %channel.url(), error = %e, "Signal channel failed to start");
        return Err(anyhow::anyhow!(
            "Failed to listen on {}: {}. Check that the address is free and writable.",
            channel.url(),
            e
        ));
    }

    println!("{}", channel.url());
    info!(url = %channel.url(), "Listening for signals");

    let options = ListenOptions { once: args.once };
    let mut stdout = std::io::stdout();
    let received = listen::run(
        channel.as_ref(),
        &mut events,
        options,
        &mut stdout,
        shutdown_signal(),
    )
    .await?;

    info!(received, "Signal listener stopped");
    Ok(())
}
