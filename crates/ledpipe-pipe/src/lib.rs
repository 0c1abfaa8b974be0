//! Line-oriented pipe to an LED controller.
//!
//! This is the layer application code talks to. A [`Pipe`] owns a transport,
//! a line framer and a codec, and exposes non-blocking send and poll calls
//! meant to be driven from a periodic control loop.
//!
//! Pick the transport at construction: pass a `NetworkTransport`,
//! `SerialTransport` or mock directly, or use [`open`] with a [`Target`] to
//! get a boxed one.

pub mod connector;
pub mod error;
pub mod pipe;

pub use connector::{open, Target, TargetParseError};
pub use error::{PipeError, Result};
pub use pipe::{Pipe, PipeConfig, DEFAULT_READ_CHUNK};
