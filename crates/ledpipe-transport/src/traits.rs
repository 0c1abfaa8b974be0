use bytes::Bytes;

use crate::error::Result;

/// The capability set every LED controller link provides.
///
/// Implementations never add framing: `write` sends exactly the bytes it is
/// given, and `poll_readable` hands back whatever arrived, which may be a
/// partial line or several lines at once.
pub trait Transport {
    /// Write `bytes` in full.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Return up to `max` newly available bytes without blocking the caller
    /// for longer than the configured read timeout.
    ///
    /// "Nothing yet" is an empty `Bytes`, not an error.
    fn poll_readable(&mut self, max: usize) -> Result<Bytes>;

    /// Last-known liveness. Performs no I/O.
    fn is_connected(&self) -> bool;

    /// Release the underlying resources. Calling it again is a no-op.
    fn close(&mut self);

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }

    fn poll_readable(&mut self, max: usize) -> Result<Bytes> {
        (**self).poll_readable(max)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    #[derive(Default)]
    struct Loopback {
        data: Vec<u8>,
        closed: bool,
    }

    impl Transport for Loopback {
        fn write(&mut self, bytes: &[u8]) -> Result<()> {
            if self.closed {
                return Err(TransportError::Closed);
            }
            self.data.extend_from_slice(bytes);
            Ok(())
        }

        fn poll_readable(&mut self, max: usize) -> Result<Bytes> {
            let n = max.min(self.data.len());
            Ok(Bytes::from(self.data.drain(..n).collect::<Vec<_>>()))
        }

        fn is_connected(&self) -> bool {
            !self.closed
        }

        fn close(&mut self) {
            self.closed = true;
        }

        fn transport_name(&self) -> &'static str {
            "loopback"
        }
    }

    #[test]
    fn boxed_transport_delegates() {
        let mut boxed: Box<dyn Transport> = Box::new(Loopback::default());
        boxed.write(b"abc").unwrap();
        assert_eq!(boxed.poll_readable(2).unwrap().as_ref(), b"ab");
        assert_eq!(boxed.poll_readable(8).unwrap().as_ref(), b"c");
        assert!(boxed.poll_readable(8).unwrap().is_empty());
        assert_eq!(boxed.transport_name(), "loopback");

        boxed.close();
        boxed.close();
        assert!(!boxed.is_connected());
        assert!(matches!(boxed.write(b"x"), Err(TransportError::Closed)));
    }
}
