use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use crate::config::TransportConfig;
use crate::error::{is_disconnect_kind, Result, TransportError};
use crate::io::{read_available, write_fully, ReadOutcome};
use crate::traits::Transport;

/// Slice used while waiting for a full output queue when no write timeout is set.
const WRITE_WAIT_SLICE: Duration = Duration::from_millis(100);

/// Serial transport over a tty device node.
///
/// Line discipline (baud rate, parity, raw mode) is expected to be set up
/// before the node is handed over. The descriptor is switched to
/// non-blocking mode; `poll_readable` waits on `poll(2)` for at most
/// `read_timeout` before reading.
pub struct SerialTransport {
    file: Option<File>,
    path: Option<PathBuf>,
    connected: bool,
    config: TransportConfig,
}

impl SerialTransport {
    /// Open a serial device node such as `/dev/ttyACM0`.
    pub fn open(path: impl AsRef<Path>, config: &TransportConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| TransportError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let mut transport = Self::from_file(file, config.clone())?;
        transport.path = Some(path.to_path_buf());
        info!(?path, "opened serial transport");
        Ok(transport)
    }

    /// Adopt an already-open descriptor.
    pub fn from_file(file: File, config: TransportConfig) -> Result<Self> {
        set_nonblocking(file.as_raw_fd())?;
        Ok(Self {
            file: Some(file),
            path: None,
            connected: true,
            config,
        })
    }

    /// Device path, if this transport was opened by path.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn mark_disconnected(&mut self) {
        if self.connected {
            debug!(path = ?self.path, "serial link lost");
        }
        self.connected = false;
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let write_timeout = self.config.effective_write_timeout();
        let file = self.file.as_mut().ok_or(TransportError::Closed)?;
        let fd = file.as_raw_fd();

        let result = write_fully(file, bytes, || {
            let slice = write_timeout.unwrap_or(WRITE_WAIT_SLICE);
            if wait_ready(fd, libc::POLLOUT, slice)? || write_timeout.is_none() {
                Ok(())
            } else {
                Err(std::io::Error::from(ErrorKind::TimedOut))
            }
        });

        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                if is_disconnect_kind(err.kind()) || err.kind() == ErrorKind::WriteZero {
                    self.mark_disconnected();
                }
                Err(TransportError::Io(err))
            }
        }
    }

    fn poll_readable(&mut self, max: usize) -> Result<Bytes> {
        let read_timeout = self.config.read_timeout;
        let file = self.file.as_mut().ok_or(TransportError::Closed)?;

        if !wait_ready(file.as_raw_fd(), libc::POLLIN, read_timeout)? {
            return Ok(Bytes::new());
        }

        match read_available(file, max) {
            Ok(ReadOutcome::Data(bytes)) => Ok(bytes),
            Ok(ReadOutcome::Idle) => Ok(Bytes::new()),
            Ok(ReadOutcome::Eof) => {
                self.mark_disconnected();
                Err(TransportError::Disconnected)
            }
            Err(err) => {
                if is_disconnect_kind(err.kind()) {
                    self.mark_disconnected();
                }
                Err(TransportError::Io(err))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected && self.file.is_some()
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            debug!(path = ?self.path, "closed serial transport");
        }
        self.connected = false;
    }

    fn transport_name(&self) -> &'static str {
        "serial"
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("path", &self.path)
            .field("connected", &self.is_connected())
            .finish()
    }
}

fn set_nonblocking(fd: RawFd) -> std::io::Result<()> {
    // SAFETY: `fd` is an open descriptor owned by the caller for the duration
    // of this call; F_GETFL/F_SETFL only touch its status flags.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }
    if flags & libc::O_NONBLOCK != 0 {
        return Ok(());
    }
    // SAFETY: as above.
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Wait up to `timeout` for `events` on `fd`. Returns true when ready.
///
/// Hang-up and error conditions count as ready so the following read can
/// observe EOF or the error itself.
fn wait_ready(fd: RawFd, events: libc::c_short, timeout: Duration) -> std::io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };
    let timeout_ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

    // SAFETY: `pfd` is a valid, writable pollfd and we pass a count of one.
    let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    if rc < 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() == ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(rc > 0)
}
