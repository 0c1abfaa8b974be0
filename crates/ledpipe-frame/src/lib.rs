//! Newline framing for LED controller traffic.
//!
//! Bytes arrive from a transport in arbitrary pieces across repeated poll
//! calls. [`LineFramer`] buffers them and hands back complete, trimmed,
//! non-empty lines one at a time, keeping any trailing partial line for the
//! next call.
//!
//! [`Codec`] is the boundary between lines and typed values; [`JsonCodec`]
//! is the default.
//!
//! Wire format:
//! ```text
//! {"on":true,"bri":255}\n
//! {"on":true,"bri":128,"ps":2}\n
//! ```

pub mod codec;
pub mod error;
pub mod framer;

pub use codec::{Codec, JsonCodec};
pub use error::{CodecError, FrameError, Result};
pub use framer::{FramerConfig, LineFramer, DEFAULT_MAX_LINE_LEN, DELIMITER};
