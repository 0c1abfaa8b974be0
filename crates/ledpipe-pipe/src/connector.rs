use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use ledpipe_transport::{NetworkTransport, Transport, TransportConfig};
#[cfg(unix)]
use ledpipe_transport::SerialTransport;
use tracing::debug;

use crate::error::Result;
use crate::pipe::{Pipe, PipeConfig};

/// Where an LED controller can be reached.
///
/// Accepted forms:
/// - `tcp://host:port` or bare `host:port`
/// - `serial:///dev/ttyACM0`, `serial:/dev/ttyACM0`, or a bare path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Tcp(String),
    Serial(PathBuf),
}

/// A target string that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetParseError {
    #[error("target must not be empty")]
    Empty,

    #[error("unsupported target scheme: {0}")]
    UnsupportedScheme(String),

    #[error("tcp target must be host:port, got {0:?}")]
    InvalidTcp(String),
}

impl FromStr for Target {
    type Err = TargetParseError;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TargetParseError::Empty);
        }

        if let Some(rest) = input.strip_prefix("tcp://") {
            return parse_tcp(rest);
        }
        if let Some(rest) = input
            .strip_prefix("serial://")
            .or_else(|| input.strip_prefix("serial:"))
        {
            return parse_serial(rest);
        }
        if let Some((scheme, _)) = input.split_once("://") {
            return Err(TargetParseError::UnsupportedScheme(scheme.to_string()));
        }
        if input.starts_with('/') || input.starts_with('.') {
            return parse_serial(input);
        }
        parse_tcp(input)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Tcp(addr) => write!(f, "tcp://{addr}"),
            Target::Serial(path) => write!(f, "serial:{}", path.display()),
        }
    }
}

fn parse_tcp(addr: &str) -> std::result::Result<Target, TargetParseError> {
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            Ok(Target::Tcp(addr.to_string()))
        }
        _ => Err(TargetParseError::InvalidTcp(addr.to_string())),
    }
}

fn parse_serial(path: &str) -> std::result::Result<Target, TargetParseError> {
    if path.is_empty() {
        return Err(TargetParseError::Empty);
    }
    Ok(Target::Serial(PathBuf::from(path)))
}

/// Open the transport for `target` and wrap it in a JSON pipe.
pub fn open(
    target: &Target,
    transport_config: &TransportConfig,
    pipe_config: PipeConfig,
) -> Result<Pipe<Box<dyn Transport + Send>>> {
    let transport: Box<dyn Transport + Send> = match target {
        Target::Tcp(addr) => Box::new(NetworkTransport::connect(addr, transport_config)?),
        #[cfg(unix)]
        Target::Serial(path) => Box::new(SerialTransport::open(path, transport_config)?),
        #[cfg(not(unix))]
        Target::Serial(path) => {
            return Err(ledpipe_transport::TransportError::Open {
                path: path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "serial transport requires a unix platform",
                ),
            }
            .into());
        }
    };

    debug!(%target, "opened pipe");
    Ok(Pipe::with_config(transport, pipe_config))
}
