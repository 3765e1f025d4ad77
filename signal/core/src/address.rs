//! Signal Addresses
//!
//! A channel's address is fixed at construction and exposed as a URL so it
//! can be handed to another process without knowing the transport:
//!
//! - Unix socket: `unix:///tmp/3k2j8q1x0d.sock`
//! - TCP: `tcp://127.0.0.1:6499`
//!
//! Unix socket paths are resolved once by [`resolve_socket_path`] and never
//! re-normalized afterwards.

use std::fmt;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use url::Url;

use crate::error::SignalError;

/// URL scheme for Unix socket channels
pub const UNIX_SCHEME: &str = "unix";

/// URL scheme for TCP channels
pub const TCP_SCHEME: &str = "tcp";

/// Interface the TCP channel binds to
pub const LOOPBACK: Ipv4Addr = Ipv4Addr::LOCALHOST;

/// Extension of generated socket files
const SOCKET_SUFFIX: &str = ".sock";

/// Where a channel listens
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SignalAddress {
    /// Absolute path of a Unix domain socket
    Unix(PathBuf),
    /// Port on the loopback interface
    ///
    /// Kept as requested by the caller; values outside `u16` fail at bind.
    Tcp {
        /// Requested port
        port: u32,
    },
}

impl SignalAddress {
    /// The URL form of this address
    ///
    /// Unix paths are written verbatim, without percent-encoding. A path
    /// with spaces or `%` does not survive a trip through a URL parser;
    /// peers that need the exact path should use [`SignalAddress::path`].
    #[must_use]
    pub fn url(&self) -> String {
        self.to_string()
    }

    /// Socket path, for Unix addresses
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Unix(path) => Some(path),
            Self::Tcp { .. } => None,
        }
    }

    /// Port, for TCP addresses
    #[must_use]
    pub fn port(&self) -> Option<u32> {
        match self {
            Self::Unix(_) => None,
            Self::Tcp { port } => Some(*port),
        }
    }
}

impl fmt::Display for SignalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "{UNIX_SCHEME}://{}", path.display()),
            Self::Tcp { port } => write!(f, "{TCP_SCHEME}://{LOOPBACK}:{port}"),
        }
    }
}

/// Resolve caller input into an absolute Unix socket path
///
/// - `None` generates a fresh path in the system temp directory
/// - input starting with `/` is taken verbatim
/// - anything else must parse as a URI with an absolute path component
///
/// # Errors
///
/// Returns [`SignalError::InvalidAddress`] when the input is neither an
/// absolute path nor such a URI.
pub fn resolve_socket_path(address: Option<&str>) -> Result<PathBuf, SignalError> {
    let Some(input) = address else {
        return Ok(random_socket_path());
    };

    if input.starts_with('/') {
        return Ok(PathBuf::from(input));
    }

    let url = Url::parse(input).map_err(|_| SignalError::InvalidAddress {
        input: input.to_string(),
    })?;

    resolve_socket_url(&url)
}

/// Resolve an already parsed URI into an absolute Unix socket path
///
/// # Errors
///
/// Returns [`SignalError::InvalidAddress`] when the URI has no absolute path.
pub fn resolve_socket_url(url: &Url) -> Result<PathBuf, SignalError> {
    let path = url.path();
    if path.starts_with('/') {
        Ok(PathBuf::from(path))
    } else {
        Err(SignalError::InvalidAddress {
            input: url.to_string(),
        })
    }
}

/// Generate a socket path in the system temp directory
///
/// The name is a base-36 rendering of 64 random bits. Collision avoidance
/// only: the generator is not cryptographic and the name is not a secret.
#[must_use]
pub fn random_socket_path() -> PathBuf {
    let mut rng = SmallRng::from_entropy();
    let token = to_base36(rng.gen::<u64>());
    std::env::temp_dir().join(format!("{token}{SOCKET_SUFFIX}"))
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::with_capacity(13);
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_absolute_path_is_unchanged() {
        let path = resolve_socket_path(Some("/tmp/debugger.sock")).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/debugger.sock"));
    }

    #[test]
    fn test_absolute_path_is_not_normalized() {
        let path = resolve_socket_path(Some("/tmp//a/../b.sock")).unwrap();
        assert_eq!(path.to_str(), Some("/tmp//a/../b.sock"));
    }

    #[test]
    fn test_unix_uri_path_component() {
        let path = resolve_socket_path(Some("unix:///run/user/1000/signal.sock")).unwrap();
        assert_eq!(path, PathBuf::from("/run/user/1000/signal.sock"));
    }

    #[test]
    fn test_file_uri_path_component() {
        let path = resolve_socket_path(Some("file:///var/tmp/x.sock")).unwrap();
        assert_eq!(path, PathBuf::from("/var/tmp/x.sock"));
    }

    #[test]
    fn test_uri_with_host_keeps_path_only() {
        let path = resolve_socket_path(Some("ws://localhost:1234/tmp/x.sock")).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/x.sock"));
    }

    #[test]
    fn test_invalid_inputs() {
        for input in ["not a path or uri", "relative/path.sock", "", "mailto:someone"] {
            match resolve_socket_path(Some(input)) {
                Err(SignalError::InvalidAddress { .. }) => {}
                other => panic!("expected InvalidAddress for {input:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_invalid_address_names_input() {
        let err = resolve_socket_path(Some("not a path or uri")).unwrap_err();
        assert!(err.to_string().contains("not a path or uri"));
    }

    #[test]
    fn test_random_path_in_temp_dir() {
        let path = random_socket_path();
        assert_eq!(path.parent(), Some(std::env::temp_dir().as_path()));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("sock"));
        assert!(path.is_absolute());
    }

    #[test]
    fn test_random_paths_differ() {
        let paths: std::collections::HashSet<_> = (0..64).map(|_| random_socket_path()).collect();
        assert_eq!(paths.len(), 64);
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(u64::MAX), "3w5e11264sgsf");
    }

    #[test]
    fn test_address_urls() {
        let unix = SignalAddress::Unix(PathBuf::from("/tmp/a.sock"));
        assert_eq!(unix.url(), "unix:///tmp/a.sock");
        assert_eq!(unix.path(), Some(Path::new("/tmp/a.sock")));
        assert_eq!(unix.port(), None);

        let tcp = SignalAddress::Tcp { port: 6499 };
        assert_eq!(tcp.url(), "tcp://127.0.0.1:6499");
        assert_eq!(tcp.port(), Some(6499));
        assert_eq!(tcp.path(), None);
    }

    #[test]
    fn test_unix_url_round_trips_path() {
        let unix = SignalAddress::Unix(PathBuf::from("/tmp/a.sock"));
        let parsed = resolve_socket_path(Some(&unix.url())).unwrap();
        assert_eq!(parsed, PathBuf::from("/tmp/a.sock"));
    }

    #[test]
    fn test_unix_url_keeps_path_verbatim() {
        let unix = SignalAddress::Unix(PathBuf::from("/tmp/a b%.sock"));
        assert_eq!(unix.url(), "unix:///tmp/a b%.sock");
        assert_eq!(unix.path(), Some(Path::new("/tmp/a b%.sock")));
    }
}
