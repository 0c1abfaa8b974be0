//! Byte transports for talking to an LED controller.
//!
//! Every transport exposes the same small capability set through the
//! [`Transport`] trait:
//! - write an exact byte sequence
//! - report newly available bytes without blocking the caller
//! - report last-known liveness
//! - close (idempotent)
//!
//! Provided implementations:
//! - [`NetworkTransport`]: TCP
//! - [`SerialTransport`]: serial device nodes (unix)
//!
//! Framing lives one layer up, in `ledpipe-frame`.

pub mod config;
pub mod error;
mod io;
pub mod network;
#[cfg(unix)]
pub mod serial;
pub mod traits;

pub use config::{TransportConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT};
pub use error::{Result, TransportError};
pub use network::NetworkTransport;
#[cfg(unix)]
pub use serial::SerialTransport;
pub use traits::Transport;
