//! Signal Core - Fire-and-Forget Signal Channels
//!
//! A signal channel is a local listener a controlling process opens so an
//! external peer (a debugger front-end, a test harness, a supervisor) can
//! deliver short notifications without a bidirectional protocol.
//!
//! # Architecture
//!
//! ```text
//!   peer process                         controlling process
//! ┌──────────────┐   unix:///tmp/x.sock  ┌────────────────────┐
//! │ connect+send ├──────────────────────►│ UnixSignal         │──┐
//! └──────────────┘                       └────────────────────┘  │  SignalEvents
//! ┌──────────────┐  tcp://127.0.0.1:6499 ┌────────────────────┐  ├──────────────► consumer
//! │ connect+send ├──────────────────────►│ TcpSignal          │──┘
//! └──────────────┘                       └────────────────────┘
//! ```
//!
//! Payloads are opaque: every chunk read from a connection becomes one
//! [`SignalEvent::Received`]. There is no framing, no reply path, and no
//! reconnection. A closed channel stays closed.
//!
//! # Quick Start
//!
//! ```ignore
//! use signal_core::{ChannelConfig, SignalChannel, SignalEvent, UnixSignal};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), signal_core::SignalError> {
//!     let (signal, mut events) = UnixSignal::new(None, ChannelConfig::process_default())?;
//!     signal.ready().await?;
//!     println!("send signals to {}", signal.url());
//!
//!     while let Some(event) = events.recv().await {
//!         if let SignalEvent::Received { payload, .. } = event {
//!             println!("{payload}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`address`]: address resolution and URL formatting
//! - [`config`]: channel configuration and the diagnostic logging toggle
//! - [`error`]: the [`SignalError`] taxonomy
//! - [`events`]: [`SignalEvent`] and the [`SignalEvents`] receiver
//! - [`transport`]: the Unix socket and TCP channels

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod address;
pub mod config;
pub mod error;
pub mod events;
pub mod transport;

// Re-exports for convenience
pub use address::{random_socket_path, resolve_socket_path, resolve_socket_url, SignalAddress};
pub use config::ChannelConfig;
pub use error::SignalError;
pub use events::{ConnectionId, SignalEvent, SignalEvents};
pub use transport::{open_channel, ChannelState, SignalChannel, TcpSignal, TransportType};

#[cfg(unix)]
pub use transport::UnixSignal;
