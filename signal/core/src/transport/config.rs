//! Transport Configuration
//!
//! Selects which signal transport to open, so upstream code can take the
//! choice from its own configuration and stay transport-agnostic.

use serde::{Deserialize, Serialize};

/// Transport type selection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportType {
    /// Unix domain socket (same host, path addressed)
    #[cfg(unix)]
    UnixSocket {
        /// Absolute path or URI (None = random temp path)
        #[serde(default)]
        address: Option<String>,
    },

    /// TCP on the loopback interface
    Tcp {
        /// Port to bind; must be explicit
        port: u32,
    },
}

impl TransportType {
    /// Unix socket at a random temp path
    #[cfg(unix)]
    #[must_use]
    pub fn local() -> Self {
        Self::UnixSocket { address: None }
    }

    /// Loopback TCP on `port`
    #[must_use]
    pub fn tcp(port: u32) -> Self {
        Self::Tcp { port }
    }

    /// Check if this is a Unix socket configuration
    #[must_use]
    pub fn is_unix_socket(&self) -> bool {
        match self {
            #[cfg(unix)]
            Self::UnixSocket { .. } => true,
            Self::Tcp { .. } => false,
        }
    }
}

#[cfg(unix)]
impl Default for TransportType {
    fn default() -> Self {
        Self::local()
    }
}
