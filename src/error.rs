//! Error types for shortkv

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Phase of a dial in which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialPhase {
    /// TCP connect
    Tcp,
    /// TLS negotiation (including certificate verification)
    Tls,
    /// Initial ACL authentication
    Auth,
}

impl fmt::Display for DialPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Tls => write!(f, "tls"),
            Self::Auth => write!(f, "auth"),
        }
    }
}

/// Administrative step of the post-connect handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    /// Splitting the dial address into host and port
    SplitAddress,
    /// `CONFIG SET cluster-announce-ip <host>`
    AnnounceIp,
    /// `CONFIG SET masterauth <password>`
    MasterAuth,
}

impl fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SplitAddress => write!(f, "split-address"),
            Self::AnnounceIp => write!(f, "cluster-announce-ip"),
            Self::MasterAuth => write!(f, "masterauth"),
        }
    }
}

/// Coarse error taxonomy exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or unreadable input; fails before network I/O
    Configuration,
    /// Network, timeout or TLS failure while connecting
    Dial,
    /// Administrative command failed after the pool was built
    Handshake,
    /// A command on a fully constructed client failed
    Command,
}

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// TLS material could not be read
    #[error("failed to read TLS material from '{}': {source}", path.display())]
    TlsMaterialIo {
        /// Offending file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The CA file held no usable certificate
    #[error("untrusted CA material: no valid PEM certificate in '{}'", .0.display())]
    UntrustedCa(PathBuf),

    /// The client certificate/key pair could not be loaded
    #[error(
        "failed to read and parse key '{}' from '{}': {reason}",
        key.display(),
        cert.display()
    )]
    ClientIdentity {
        /// Client certificate file
        cert: PathBuf,
        /// Client key file
        key: PathBuf,
        /// Why loading failed
        reason: String,
    },

    /// Establishing a physical connection failed
    #[error("dial {addr} failed during {phase}: {reason}")]
    Dial {
        /// Dialed address
        addr: String,
        /// Failing phase
        phase: DialPhase,
        /// Cause
        reason: String,
    },

    /// The pool could not be built
    #[error("pool construction for {addr} failed: {source}")]
    PoolInit {
        /// Dialed address
        addr: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// A post-connect step failed; the pool has been closed
    #[error("post-connect step {step} failed, closing client connection: {source}")]
    Handshake {
        /// Failing step
        step: HandshakeStep,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// A command issued through a client failed
    #[error("failed to perform action {action}: {source}")]
    Command {
        /// Textual form of the command, secrets redacted
        action: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// The store replied with an error
    #[error("server error: {0}")]
    Server(String),

    /// Wire protocol violation
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Operation exceeded its deadline
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Connection closed by peer
    #[error("connection closed")]
    ConnectionClosed,

    /// Pool already closed
    #[error("pool closed")]
    PoolClosed,

    /// Invalid connection state transition
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// Short link key already exists
    #[error("short '{0}' is already in use")]
    ShortInUse(String),
}

impl Error {
    /// Map the error onto the caller-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_)
            | Error::TlsMaterialIo { .. }
            | Error::UntrustedCa(_)
            | Error::ClientIdentity { .. } => ErrorKind::Configuration,
            Error::Dial { .. } => ErrorKind::Dial,
            Error::PoolInit { source, .. } => match source.kind() {
                ErrorKind::Configuration => ErrorKind::Configuration,
                _ => ErrorKind::Dial,
            },
            Error::Handshake { step, .. } => match step {
                HandshakeStep::SplitAddress => ErrorKind::Configuration,
                _ => ErrorKind::Handshake,
            },
            _ => ErrorKind::Command,
        }
    }

    /// Whether retrying the same call may succeed without changing input
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::Dial { phase, .. } => *phase == DialPhase::Tcp,
            Error::PoolInit { source, .. } | Error::Command { source, .. } => {
                source.is_retriable()
            }
            Error::Handshake { step, source } => {
                *step != HandshakeStep::SplitAddress && source.is_retriable()
            }
            Error::Io(_) | Error::Timeout(_) | Error::ConnectionClosed => true,
            _ => false,
        }
    }

    /// Whether the physical connection that produced this error must be discarded
    pub(crate) fn breaks_connection(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::Timeout(_)
                | Error::ConnectionClosed
                | Error::Protocol(_)
                | Error::InvalidState { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untrusted_ca_distinct_from_io() {
        let untrusted = Error::UntrustedCa(PathBuf::from("/etc/ca.pem"));
        let io = Error::TlsMaterialIo {
            path: PathBuf::from("/etc/ca.pem"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };

        assert!(matches!(untrusted, Error::UntrustedCa(_)));
        assert!(untrusted.to_string().contains("untrusted CA material"));
        assert!(io.to_string().contains("/etc/ca.pem"));
        assert!(!io.to_string().contains("untrusted"));
        assert_eq!(untrusted.kind(), ErrorKind::Configuration);
        assert_eq!(io.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_client_identity_names_both_paths() {
        let err = Error::ClientIdentity {
            cert: PathBuf::from("client.pem"),
            key: PathBuf::from("client.key"),
            reason: "no private key".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("client.pem"));
        assert!(msg.contains("client.key"));
    }

    #[test]
    fn test_dial_message_includes_phase_and_cause() {
        let tls = Error::Dial {
            addr: "store:6379".into(),
            phase: DialPhase::Tls,
            reason: "invalid peer certificate: UnknownIssuer".into(),
        };
        let tcp = Error::Dial {
            addr: "store:6379".into(),
            phase: DialPhase::Tcp,
            reason: "timed out after 10s".into(),
        };
        assert_eq!(tls.kind(), tcp.kind());
        assert!(tls.to_string().contains("tls"));
        assert!(tls.to_string().contains("UnknownIssuer"));
        assert!(tcp.to_string().contains("during tcp"));
        assert!(tcp.is_retriable());
        assert!(!tls.is_retriable());
    }

    #[test]
    fn test_handshake_kind() {
        let err = Error::Handshake {
            step: HandshakeStep::AnnounceIp,
            source: Box::new(Error::Server("ERR unknown".into())),
        };
        assert_eq!(err.kind(), ErrorKind::Handshake);
        assert!(!err.is_retriable());

        let split = Error::Handshake {
            step: HandshakeStep::SplitAddress,
            source: Box::new(Error::Config("missing port".into())),
        };
        assert_eq!(split.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_command_wraps_action() {
        let err = Error::Command {
            action: "GET k".into(),
            source: Box::new(Error::ConnectionClosed),
        };
        assert_eq!(err.to_string(), "failed to perform action GET k: connection closed");
        assert_eq!(err.kind(), ErrorKind::Command);
        assert!(err.is_retriable());
    }

    #[test]
    fn test_breaks_connection() {
        assert!(Error::ConnectionClosed.breaks_connection());
        assert!(Error::Timeout(Duration::from_secs(1)).breaks_connection());
        assert!(Error::Protocol("bad".into()).breaks_connection());
        assert!(!Error::Server("ERR".into()).breaks_connection());
        assert!(!Error::PoolClosed.breaks_connection());
    }
}
