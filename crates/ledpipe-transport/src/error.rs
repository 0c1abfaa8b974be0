use std::path::PathBuf;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The address could not be resolved to any socket address.
    #[error("failed to resolve {addr}: {source}")]
    Resolve {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to open the specified device node.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote end went away (EOF or reset).
    #[error("transport disconnected")]
    Disconnected,

    /// The transport has been closed locally.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Returns true if this error means the link is gone for good.
    pub fn is_disconnect(&self) -> bool {
        match self {
            TransportError::Disconnected | TransportError::Closed => true,
            TransportError::Io(err) => is_disconnect_kind(err.kind()),
            _ => false,
        }
    }
}

/// I/O error kinds that indicate the peer is no longer reachable.
pub(crate) fn is_disconnect_kind(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::UnexpectedEof
    )
}

/// I/O error kinds that mean "nothing yet" on a poll rather than a failure.
pub(crate) fn is_idle_kind(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::Interrupted
    )
}

pub type Result<T> = std::result::Result<T, TransportError>;
