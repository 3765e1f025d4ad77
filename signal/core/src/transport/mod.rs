//! Signal Transports
//!
//! Two listeners with one contract:
//! - [`UnixSignal`]: Unix domain socket at a path (same host)
//! - [`TcpSignal`]: TCP on the loopback interface
//!
//! Both implement [`SignalChannel`] on their own. What they share lives in
//! composed helpers: the lifecycle state machine and accept loop, the
//! per-connection relay, and the event emitter. The transports differ only
//! in how they resolve and bind their address.

pub mod config;
mod emitter;
pub mod factory;
mod lifecycle;
mod relay;
pub mod tcp;
pub mod traits;
#[cfg(unix)]
pub mod unix_socket;

// Re-exports for convenience
pub use config::TransportType;
pub use factory::open_channel;
pub use tcp::TcpSignal;
pub use traits::{ChannelState, SignalChannel};

#[cfg(unix)]
pub use unix_socket::UnixSignal;
