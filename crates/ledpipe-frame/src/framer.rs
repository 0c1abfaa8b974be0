use bytes::{Buf, BytesMut};
use tracing::{trace, warn};

use crate::error::{FrameError, Result};

/// Line delimiter on the wire.
pub const DELIMITER: u8 = b'\n';

/// Default maximum line length: 64 KiB.
pub const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024;

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Configuration for [`LineFramer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramerConfig {
    /// Longest line accepted, excluding the delimiter and one `\r` before
    /// it. Other surrounding whitespace counts. `None` disables the cap.
    pub max_line_len: Option<usize>,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            max_line_len: Some(DEFAULT_MAX_LINE_LEN),
        }
    }
}

/// Turns a byte stream delivered in arbitrary pieces into complete lines.
///
/// Each extraction returns at most one line. Complete lines that arrive
/// together stay buffered and are returned by later calls, with or without
/// new input, so a caller polling once per control-loop tick never loses a
/// line. [`LineFramer::drain_lines`] empties the buffer in one go.
///
/// Lines are decoded as UTF-8 only after their delimiter arrives, so a
/// multi-byte character split across two appends decodes intact. Invalid
/// sequences become U+FFFD.
pub struct LineFramer {
    buf: BytesMut,
    /// Prefix of `buf` already known to hold no delimiter.
    scanned: usize,
    /// Dropping the rest of an oversized line.
    discarding: bool,
    /// Error held back by `drain_lines` so lines before it are not lost.
    deferred: Option<FrameError>,
    config: FramerConfig,
}

impl LineFramer {
    /// Create a framer with default configuration.
    pub fn new() -> Self {
        Self::with_config(FramerConfig::default())
    }

    /// Create a framer with explicit configuration.
    pub fn with_config(config: FramerConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            scanned: 0,
            discarding: false,
            deferred: None,
            config,
        }
    }

    /// Append `new_bytes` and return the next complete line, if any.
    ///
    /// Empty input is allowed and only extracts what is already buffered.
    pub fn append_and_extract(&mut self, new_bytes: &[u8]) -> Result<Option<String>> {
        self.append(new_bytes);
        self.next_line()
    }

    /// Append `new_bytes` and return every complete line now buffered.
    ///
    /// An oversized line hit after some lines were collected is reported by
    /// the next call instead, so the collected lines are still delivered.
    pub fn drain_lines(&mut self, new_bytes: &[u8]) -> Result<Vec<String>> {
        self.append(new_bytes);

        let mut lines = Vec::new();
        loop {
            match self.next_line() {
                Ok(Some(line)) => lines.push(line),
                Ok(None) => return Ok(lines),
                Err(err) if lines.is_empty() => return Err(err),
                Err(err) => {
                    self.deferred = Some(err);
                    return Ok(lines);
                }
            }
        }
    }

    /// Extract the next complete line without appending anything.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }

        loop {
            let Some(idx) = self.find_delimiter() else {
                return self.hold_partial();
            };

            let raw = self.buf.split_to(idx + 1);
            self.scanned = 0;

            if self.discarding {
                self.discarding = false;
                trace!(len = raw.len(), "skipped tail of oversized line");
                continue;
            }

            if let Some(max) = self.config.max_line_len {
                let size = without_trailing_cr(&raw[..idx]);
                if size > max {
                    warn!(size, max, "dropping oversized line");
                    return Err(FrameError::LineTooLong { size, max });
                }
            }

            let line = String::from_utf8_lossy(&raw[..idx]).trim().to_string();
            if line.is_empty() {
                continue;
            }

            trace!(len = line.len(), "extracted line");
            return Ok(Some(line));
        }
    }

    /// Number of bytes buffered but not yet returned as lines.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drop all buffered data and any framing state.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.scanned = 0;
        self.discarding = false;
        self.deferred = None;
    }

    /// Current framer configuration.
    pub fn config(&self) -> &FramerConfig {
        &self.config
    }

    /// Update the line-length cap for subsequent extraction.
    pub fn set_max_line_len(&mut self, max_line_len: Option<usize>) {
        self.config.max_line_len = max_line_len;
    }

    fn append(&mut self, new_bytes: &[u8]) {
        if !new_bytes.is_empty() {
            self.buf.extend_from_slice(new_bytes);
        }
    }

    fn find_delimiter(&self) -> Option<usize> {
        self.buf[self.scanned..]
            .iter()
            .position(|&b| b == DELIMITER)
            .map(|pos| self.scanned + pos)
    }

    /// No delimiter buffered: keep the partial line unless it broke the cap.
    fn hold_partial(&mut self) -> Result<Option<String>> {
        if self.discarding {
            self.buf.advance(self.buf.len());
            self.scanned = 0;
            return Ok(None);
        }

        self.scanned = self.buf.len();

        if let Some(max) = self.config.max_line_len {
            let size = without_trailing_cr(&self.buf);
            if size > max {
                warn!(size, max, "dropping oversized partial line");
                self.buf.clear();
                self.scanned = 0;
                self.discarding = true;
                return Err(FrameError::LineTooLong { size, max });
            }
        }

        Ok(None)
    }
}

/// Length of `bytes` not counting one trailing `\r`.
fn without_trailing_cr(bytes: &[u8]) -> usize {
    match bytes.last() {
        Some(b'\r') => bytes.len() - 1,
        _ => bytes.len(),
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LineFramer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineFramer")
            .field("pending", &self.buf.len())
            .field("discarding", &self.discarding)
            .field("config", &self.config)
            .finish()
    }
}
