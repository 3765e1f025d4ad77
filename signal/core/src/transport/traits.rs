//! The signal channel contract
//!
//! Both transports implement [`SignalChannel`] independently; code holding a
//! `Box<dyn SignalChannel>` never needs to know which one it has.

use async_trait::async_trait;

use crate::address::SignalAddress;
use crate::error::SignalError;
use crate::events::SignalEvents;

/// Lifecycle state of a channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    /// Construction returned; the listener is not bound yet
    Binding,
    /// Accepting connections
    Listening,
    /// Terminal; the listener is released
    Closed,
}

/// A listener that relays inbound connections as [`SignalEvent`]s
///
/// [`SignalEvent`]: crate::events::SignalEvent
#[async_trait]
pub trait SignalChannel: Send + Sync {
    /// Where the channel listens, fixed at construction
    fn address(&self) -> &SignalAddress;

    /// URL a peer process should connect to
    ///
    /// Available immediately after construction, whatever the bind outcome.
    fn url(&self) -> String {
        self.address().url()
    }

    /// Current lifecycle state
    fn state(&self) -> ChannelState;

    /// Wait until the listener accepts connections
    ///
    /// Resolves exactly once; later calls observe the same outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::BindFailure`] if the OS refused the address, or
    /// [`SignalError::Closed`] if the channel was closed before binding.
    async fn ready(&self) -> Result<(), SignalError>;

    /// A new receiver for events emitted from now on
    fn subscribe(&self) -> SignalEvents;

    /// Stop the channel
    ///
    /// Idempotent and non-blocking. No connection is accepted once this
    /// returns; `Closed` is emitted when the listener has been released.
    fn close(&self);

    /// Wait until the channel has fully closed
    async fn closed(&self);
}
