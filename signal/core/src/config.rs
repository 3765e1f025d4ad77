//! Channel Configuration
//!
//! The only knob a channel has is the diagnostic logging toggle. It is passed
//! explicitly into every constructor; [`ChannelConfig::process_default`]
//! gives the value derived from the environment, read once per process.
//!
//! # Environment Variables
//!
//! - `SIGNAL_DEBUG`: "1", "true", "yes" or "on" to log every emitted event

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Environment variable controlling diagnostic event logging
pub const DEBUG_ENV_VAR: &str = "SIGNAL_DEBUG";

/// Configuration shared by both signal transports
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Log every emitted event through `tracing`
    ///
    /// Side-channel observability only. Delivery is identical either way.
    pub debug: bool,
}

impl ChannelConfig {
    /// Configuration with diagnostic logging enabled
    #[must_use]
    pub fn debug() -> Self {
        Self { debug: true }
    }

    /// Load configuration from environment variables
    ///
    /// Reads the environment on every call. Most callers want
    /// [`ChannelConfig::process_default`] instead.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            debug: std::env::var(DEBUG_ENV_VAR)
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }

    /// Configuration derived from the environment the first time this is
    /// called in the process
    ///
    /// Later changes to the environment are not observed.
    #[must_use]
    pub fn process_default() -> Self {
        static PROCESS_CONFIG: OnceLock<ChannelConfig> = OnceLock::new();
        *PROCESS_CONFIG.get_or_init(Self::from_env)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
