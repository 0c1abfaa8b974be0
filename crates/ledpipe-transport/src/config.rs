use std::time::Duration;

/// Default connect timeout for network transports: 1 s.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default bounded wait inside `poll_readable`: 20 ms.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(20);

/// Configuration shared by the real transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Upper bound on establishing a TCP connection.
    pub connect_timeout: Duration,
    /// Longest a single `poll_readable` call may wait for data.
    pub read_timeout: Duration,
    /// Write timeout for blocking writes. `None` blocks until done.
    pub write_timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: None,
        }
    }
}

impl TransportConfig {
    /// Read timeout clamped to something the OS accepts.
    ///
    /// `set_read_timeout(Some(0))` is an error on std sockets, so zero is
    /// bumped to one millisecond.
    pub(crate) fn effective_read_timeout(&self) -> Duration {
        if self.read_timeout.is_zero() {
            Duration::from_millis(1)
        } else {
            self.read_timeout
        }
    }

    /// Write timeout with zero treated as "no timeout".
    pub(crate) fn effective_write_timeout(&self) -> Option<Duration> {
        self.write_timeout.filter(|timeout| !timeout.is_zero())
    }
}
