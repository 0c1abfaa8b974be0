//! Newline-delimited JSON link to LED controllers.
//!
//! ledpipe sends command lines such as `{"on":true,"bri":255}` to a
//! controller and polls for its replies without ever blocking a control loop
//! for longer than a short, configurable read timeout.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte transports (TCP, serial) behind one trait
//! - [`frame`]: Line framing and the JSON codec
//! - [`pipe`]: Send/poll API over any transport
//! - [`mock`]: Mock transport with state accumulation (behind `mock` feature)

/// Re-export transport types.
pub mod transport {
    pub use ledpipe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use ledpipe_frame::*;
}

/// Re-export pipe types.
pub mod pipe {
    pub use ledpipe_pipe::*;
}

/// Re-export mock types (requires `mock` feature).
#[cfg(feature = "mock")]
pub mod mock {
    pub use ledpipe_mock::*;
}

pub use ledpipe_pipe::{open, Pipe, PipeConfig, PipeError, Target};
