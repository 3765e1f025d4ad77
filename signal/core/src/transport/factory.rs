//! Transport Factory
//!
//! Opens the signal channel named by a [`TransportType`].

use super::config::TransportType;
use super::tcp::TcpSignal;
use super::traits::SignalChannel;
#[cfg(unix)]
use super::unix_socket::UnixSignal;
use crate::config::ChannelConfig;
use crate::error::SignalError;
use crate::events::SignalEvents;

/// Open a signal channel based on configuration
///
/// # Errors
///
/// Returns [`SignalError::InvalidAddress`] for a malformed Unix socket
/// address. Bind failures are reported through the channel's readiness.
///
/// # Example
///
/// ```ignore
/// use signal_core::{open_channel, ChannelConfig, TransportType};
///
/// let (channel, mut events) = open_channel(&TransportType::local(), ChannelConfig::default())?;
/// channel.ready().await?;
/// println!("{}", channel.url());
/// ```
pub fn open_channel(
    transport: &TransportType,
    config: ChannelConfig,
) -> Result<(Box<dyn SignalChannel>, SignalEvents), SignalError> {
    match transport {
        #[cfg(unix)]
        TransportType::UnixSocket { address } => {
            let (signal, events) = UnixSignal::new(address.as_deref(), config)?;
            Ok((Box::new(signal), events))
        }

        TransportType::Tcp { port } => {
            let (signal, events) = TcpSignal::new(*port, config);
            Ok((Box::new(signal), events))
        }
    }
}
