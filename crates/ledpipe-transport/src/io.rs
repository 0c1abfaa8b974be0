//! Read/write loops shared by the stream-backed transports.

use std::io::{ErrorKind, Read, Write};

use bytes::{Bytes, BytesMut};

use crate::error::is_idle_kind;

/// Result of one non-blocking read attempt.
#[derive(Debug)]
pub(crate) enum ReadOutcome {
    Data(Bytes),
    Idle,
    Eof,
}

/// Read at most `max` bytes in a single call.
///
/// Timeouts, would-block and interrupted reads all map to `Idle`.
pub(crate) fn read_available<R: Read>(src: &mut R, max: usize) -> std::io::Result<ReadOutcome> {
    if max == 0 {
        return Ok(ReadOutcome::Idle);
    }

    let mut buf = BytesMut::zeroed(max);
    match src.read(&mut buf) {
        Ok(0) => Ok(ReadOutcome::Eof),
        Ok(n) => {
            buf.truncate(n);
            Ok(ReadOutcome::Data(buf.freeze()))
        }
        Err(err) if is_idle_kind(err.kind()) => Ok(ReadOutcome::Idle),
        Err(err) => Err(err),
    }
}

/// Write every byte of `bytes`, then flush.
///
/// `wait_writable` is called whenever the destination reports `WouldBlock`;
/// it either waits for the destination to drain or returns an error to abort.
pub(crate) fn write_fully<W, F>(dst: &mut W, bytes: &[u8], mut wait_writable: F) -> std::io::Result<()>
where
    W: Write,
    F: FnMut() -> std::io::Result<()>,
{
    let mut offset = 0usize;
    while offset < bytes.len() {
        match dst.write(&bytes[offset..]) {
            Ok(0) => return Err(std::io::Error::from(ErrorKind::WriteZero)),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => wait_writable()?,
            Err(err) => return Err(err),
        }
    }

    loop {
        match dst.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}
