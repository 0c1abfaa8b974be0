//! Mock transport for exercising LED controller code without hardware.
//!
//! [`MockTransport`] implements the same `Transport` trait as the real links,
//! so it drives the real line framer. On top of that it:
//! - reports every sent chunk to an optional observer
//! - merges every sent JSON object into an accumulated state map
//! - serves queued response lines back in FIFO order
//! - simulates a togglable connection flag

pub mod mock;

pub use mock::{MockTransport, SendObserver};
