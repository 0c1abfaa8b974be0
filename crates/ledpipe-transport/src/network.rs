use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use bytes::Bytes;
use tracing::{debug, info};

use crate::config::TransportConfig;
use crate::error::{is_disconnect_kind, Result, TransportError};
use crate::io::{read_available, write_fully, ReadOutcome};
use crate::traits::Transport;

/// TCP transport to an LED controller.
///
/// Nagle is disabled so single command lines leave immediately. Reads wait at
/// most `read_timeout`, which keeps `poll_readable` safe to call from a
/// periodic control loop.
pub struct NetworkTransport {
    stream: Option<TcpStream>,
    peer: SocketAddr,
    connected: bool,
    config: TransportConfig,
}

impl NetworkTransport {
    /// Resolve `addr` (`host:port`) and connect to the first address that
    /// answers within `connect_timeout`.
    pub fn connect(addr: &str, config: &TransportConfig) -> Result<Self> {
        let candidates: Vec<SocketAddr> = addr
            .to_socket_addrs()
            .map_err(|source| TransportError::Resolve {
                addr: addr.to_string(),
                source,
            })?
            .collect();

        if candidates.is_empty() {
            return Err(TransportError::Resolve {
                addr: addr.to_string(),
                source: std::io::Error::new(ErrorKind::NotFound, "no addresses resolved"),
            });
        }

        let mut last_err = None;
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, config.connect_timeout) {
                Ok(stream) => return Self::from_stream(stream, config.clone()),
                Err(err) => {
                    debug!(%candidate, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::Connect {
            addr: addr.to_string(),
            source: last_err
                .unwrap_or_else(|| std::io::Error::new(ErrorKind::NotConnected, "no candidates")),
        })
    }

    /// Wrap an already-connected stream and apply `config` to it.
    pub fn from_stream(stream: TcpStream, config: TransportConfig) -> Result<Self> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(config.effective_read_timeout()))?;
        stream.set_write_timeout(config.effective_write_timeout())?;
        let peer = stream.peer_addr()?;

        info!(%peer, "connected to led controller over tcp");

        Ok(Self {
            stream: Some(stream),
            peer,
            connected: true,
            config,
        })
    }

    /// Address of the remote controller.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Current transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn mark_disconnected(&mut self) {
        if self.connected {
            debug!(peer = %self.peer, "tcp link lost");
        }
        self.connected = false;
    }
}

impl Transport for NetworkTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        let result = write_fully(stream, bytes, || {
            Err(std::io::Error::from(ErrorKind::TimedOut))
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
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;

        match read_available(stream, max) {
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
        self.connected && self.stream.is_some()
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            debug!(peer = %self.peer, "closed tcp transport");
        }
        self.connected = false;
    }

    fn transport_name(&self) -> &'static str {
        "tcp"
    }
}

impl Drop for NetworkTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for NetworkTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkTransport")
            .field("peer", &self.peer)
            .field("connected", &self.is_connected())
            .finish()
    }
}
