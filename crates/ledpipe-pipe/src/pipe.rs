use ledpipe_frame::{Codec, FramerConfig, JsonCodec, LineFramer, DELIMITER};
use ledpipe_transport::Transport;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::Result;

/// Default maximum bytes requested from the transport per poll.
pub const DEFAULT_READ_CHUNK: usize = 256;

/// Pipe-level configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeConfig {
    /// Line framing configuration.
    pub framer: FramerConfig,
    /// Maximum bytes pulled from the transport per poll.
    pub read_chunk_size: usize,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            framer: FramerConfig::default(),
            read_chunk_size: DEFAULT_READ_CHUNK,
        }
    }
}

/// Newline-delimited message pipe over any [`Transport`].
///
/// Every send writes one complete line in a single transport write. Every
/// read is non-blocking: it returns a line already buffered by an earlier
/// poll if there is one, otherwise it polls the transport once.
///
/// Nothing is retried. A failed call leaves the pipe usable for the next
/// poll cycle unless the transport reports a disconnect.
pub struct Pipe<T, C = JsonCodec> {
    transport: T,
    framer: LineFramer,
    codec: C,
    read_chunk_size: usize,
}

impl<T: Transport> Pipe<T, JsonCodec> {
    /// Create a JSON pipe with default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, PipeConfig::default())
    }

    /// Create a JSON pipe with explicit configuration.
    pub fn with_config(transport: T, config: PipeConfig) -> Self {
        Self::with_codec(transport, JsonCodec, config)
    }
}

impl<T: Transport, C: Codec> Pipe<T, C> {
    /// Create a pipe with a custom codec.
    pub fn with_codec(transport: T, codec: C, config: PipeConfig) -> Self {
        debug!(transport = transport.transport_name(), "pipe created");
        Self {
            transport,
            framer: LineFramer::with_config(config.framer),
            codec,
            read_chunk_size: config.read_chunk_size.max(1),
        }
    }

    /// Send `text` as one line, appending the delimiter if it is missing.
    pub fn send_line(&mut self, text: &str) -> Result<()> {
        trace!(len = text.len(), "sending line");
        if text.as_bytes().last() == Some(&DELIMITER) {
            self.transport.write(text.as_bytes())?;
        } else {
            let mut line = Vec::with_capacity(text.len() + 1);
            line.extend_from_slice(text.as_bytes());
            line.push(DELIMITER);
            self.transport.write(&line)?;
        }
        Ok(())
    }

    /// Write `bytes` verbatim with no framing.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.transport.write(bytes)?;
        Ok(())
    }

    /// Encode `value` with the codec and send it as one line.
    pub fn send_value<V: Serialize + ?Sized>(&mut self, value: &V) -> Result<()> {
        let text = self.codec.encode(value)?;
        self.send_line(&text)
    }

    /// Return the next complete line, or `None` if none has arrived yet.
    pub fn try_read_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.framer.next_line()? {
            return Ok(Some(line));
        }

        let chunk = self.transport.poll_readable(self.read_chunk_size)?;
        Ok(self.framer.append_and_extract(&chunk)?)
    }

    /// Return every complete line now buffered.
    ///
    /// Lines or a held-back frame error from an earlier poll are returned
    /// without touching the transport; otherwise the transport is polled once.
    pub fn try_read_lines(&mut self) -> Result<Vec<String>> {
        let buffered = self.framer.drain_lines(&[])?;
        if !buffered.is_empty() {
            return Ok(buffered);
        }

        let chunk = self.transport.poll_readable(self.read_chunk_size)?;
        Ok(self.framer.drain_lines(&chunk)?)
    }

    /// Return the next complete line decoded into `V`.
    ///
    /// A line that fails to decode is consumed and reported as an error; the
    /// next call moves on to the following line.
    pub fn try_read_value<V: DeserializeOwned>(&mut self) -> Result<Option<V>> {
        match self.try_read_line()? {
            Some(line) => Ok(Some(self.codec.decode(&line)?)),
            None => Ok(None),
        }
    }

    /// Last-known liveness of the transport.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Close the transport and drop any buffered input. Idempotent.
    pub fn close(&mut self) {
        self.transport.close();
        self.framer.clear();
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Borrow the line framer.
    pub fn framer(&self) -> &LineFramer {
        &self.framer
    }

    /// Borrow the codec.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Consume the pipe and return the transport. Buffered input is dropped.
    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl<T: Transport, C> std::fmt::Debug for Pipe<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipe")
            .field("transport", &self.transport.transport_name())
            .field("connected", &self.transport.is_connected())
            .field("framer", &self.framer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use bytes::Bytes;
    use ledpipe_frame::{CodecError, FrameError};
    use ledpipe_mock::MockTransport;
    use ledpipe_transport::TransportError;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::error::PipeError;

    /// Serves scripted chunks and records writes and poll calls.
    #[derive(Default)]
    struct ScriptedTransport {
        chunks: VecDeque<Vec<u8>>,
        written: Vec<u8>,
        polls: usize,
        fail_writes: bool,
        disconnect_when_drained: bool,
        closed: bool,
    }

    impl ScriptedTransport {
        fn with_chunks(chunks: &[&[u8]]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.to_vec()).collect(),
                ..Self::default()
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn write(&mut self, bytes: &[u8]) -> ledpipe_transport::Result<()> {
            if self.fail_writes {
                return Err(TransportError::Io(std::io::Error::from(
                    std::io::ErrorKind::BrokenPipe,
                )));
            }
            self.written.extend_from_slice(bytes);
            Ok(())
        }

        fn poll_readable(&mut self, _max: usize) -> ledpipe_transport::Result<Bytes> {
            self.polls += 1;
            match self.chunks.pop_front() {
                Some(chunk) => Ok(Bytes::from(chunk)),
                None if self.disconnect_when_drained => Err(TransportError::Disconnected),
                None => Ok(Bytes::new()),
            }
        }

        fn is_connected(&self) -> bool {
            !self.closed
        }

        fn close(&mut self) {
            self.closed = true;
        }

        fn transport_name(&self) -> &'static str {
            "scripted"
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Command {
        on: bool,
        bri: u8,
    }

    #[test]
    fn send_line_appends_single_delimiter() {
        let mut pipe = Pipe::new(ScriptedTransport::default());
        pipe.send_line(r#"{"on":true}"#).unwrap();
        pipe.send_line("{\"bri\":9}\n").unwrap();

        assert_eq!(
            pipe.transport().written,
            b"{\"on\":true}\n{\"bri\":9}\n".to_vec()
        );
    }

    #[test]
    fn send_raw_adds_nothing() {
        let mut pipe = Pipe::new(ScriptedTransport::default());
        pipe.send_raw(b"{\"on\":").unwrap();
        assert_eq!(pipe.transport().written, b"{\"on\":".to_vec());
    }

    #[test]
    fn send_value_writes_compact_json_line() {
        let mut pipe = Pipe::new(ScriptedTransport::default());
        pipe.send_value(&Command { on: true, bri: 255 }).unwrap();
        assert_eq!(
            pipe.transport().written,
            b"{\"on\":true,\"bri\":255}\n".to_vec()
        );
    }

    #[test]
    fn partial_chunks_assemble_into_line() {
        let mut pipe = Pipe::new(ScriptedTransport::with_chunks(&[b"{\"on\":tr", b"ue}\n"]));
        assert_eq!(pipe.try_read_line().unwrap(), None);
        assert_eq!(
            pipe.try_read_line().unwrap().as_deref(),
            Some(r#"{"on":true}"#)
        );
        assert_eq!(pipe.try_read_line().unwrap(), None);
    }

    #[test]
    fn buffered_lines_are_served_without_polling() {
        let mut pipe = Pipe::new(ScriptedTransport::with_chunks(&[b"a\nb\nc\n"]));

        assert_eq!(pipe.try_read_line().unwrap().as_deref(), Some("a"));
        assert_eq!(pipe.transport().polls, 1);
        assert_eq!(pipe.try_read_line().unwrap().as_deref(), Some("b"));
        assert_eq!(pipe.try_read_line().unwrap().as_deref(), Some("c"));
        assert_eq!(pipe.transport().polls, 1);

        assert_eq!(pipe.try_read_line().unwrap(), None);
        assert_eq!(pipe.transport().polls, 2);
    }

    #[test]
    fn try_read_lines_drains_burst() {
        let mut pipe = Pipe::new(ScriptedTransport::with_chunks(&[b"{\"a\":1}\n{\"b\":2}\n{\"c\""]));
        assert_eq!(
            pipe.try_read_lines().unwrap(),
            vec![r#"{"a":1}"#, r#"{"b":2}"#]
        );
        assert!(pipe.try_read_lines().unwrap().is_empty());
        assert_eq!(pipe.framer().pending_len(), 4);
    }

    #[test]
    fn buffered_lines_survive_disconnect() {
        let config = PipeConfig {
            framer: FramerConfig {
                max_line_len: Some(4),
            },
            ..PipeConfig::default()
        };
        let mut transport = ScriptedTransport::with_chunks(&[b"ok\ntoolong\nfine\n"]);
        transport.disconnect_when_drained = true;
        let mut pipe = Pipe::with_config(transport, config);

        assert_eq!(pipe.try_read_lines().unwrap(), vec!["ok"]);
        let err = pipe.try_read_lines().unwrap_err();
        assert!(matches!(err, PipeError::Frame(FrameError::LineTooLong { .. })));
        assert_eq!(pipe.try_read_lines().unwrap(), vec!["fine"]);
        assert_eq!(pipe.transport().polls, 1);

        let err = pipe.try_read_lines().unwrap_err();
        assert!(err.is_disconnect());
        assert_eq!(pipe.transport().polls, 2);
    }

    #[test]
    fn try_read_value_decodes() {
        let mut pipe = Pipe::new(ScriptedTransport::with_chunks(&[b"{\"on\":false,\"bri\":3,\"ps\":1}\n"]));
        let cmd: Command = pipe.try_read_value().unwrap().unwrap();
        assert_eq!(cmd, Command { on: false, bri: 3 });
    }

    #[test]
    fn bad_line_is_consumed_and_reported() {
        let mut pipe = Pipe::new(ScriptedTransport::with_chunks(&[b"garbage\n{\"on\":true,\"bri\":1}\n"]));

        let err = pipe.try_read_value::<Command>().unwrap_err();
        assert!(matches!(err, PipeError::Codec(CodecError::Decode { .. })));

        let cmd: Command = pipe.try_read_value().unwrap().unwrap();
        assert_eq!(cmd, Command { on: true, bri: 1 });
    }

    #[test]
    fn oversized_line_surfaces_frame_error() {
        let config = PipeConfig {
            framer: FramerConfig {
                max_line_len: Some(4),
            },
            ..PipeConfig::default()
        };
        let mut pipe = Pipe::with_config(ScriptedTransport::with_chunks(&[b"0123456789", b"\nok\n"]), config);

        let err = pipe.try_read_line().unwrap_err();
        assert!(matches!(err, PipeError::Frame(FrameError::LineTooLong { .. })));
        assert_eq!(pipe.try_read_line().unwrap().as_deref(), Some("ok"));
    }

    #[test]
    fn write_failure_is_surfaced() {
        let mut transport = ScriptedTransport::default();
        transport.fail_writes = true;
        let mut pipe = Pipe::new(transport);

        let err = pipe.send_line("{}").unwrap_err();
        assert!(matches!(err, PipeError::Transport(TransportError::Io(_))));
        assert!(err.is_disconnect());
    }

    #[test]
    fn close_drops_buffer_and_is_idempotent() {
        let mut pipe = Pipe::new(ScriptedTransport::with_chunks(&[b"a\nb\n"]));
        assert_eq!(pipe.try_read_line().unwrap().as_deref(), Some("a"));

        pipe.close();
        pipe.close();
        assert!(!pipe.is_connected());
        assert!(pipe.framer().is_empty());
    }

    #[test]
    fn mock_accumulates_values_sent_through_pipe() {
        let mut pipe = Pipe::new(MockTransport::new());
        pipe.send_value(&json!({"on": true})).unwrap();
        pipe.send_value(&json!({"bri": 5})).unwrap();
        pipe.send_line(r#"{"bri":6}"#).unwrap();

        let mock = pipe.transport();
        assert_eq!(mock.value("on"), Some(&json!(true)));
        assert_eq!(mock.value_as::<u8>("bri"), Some(6));
    }

    #[test]
    fn mock_responses_flow_through_framer() {
        let mut mock = MockTransport::new();
        mock.queue_response(r#"{"a":1}"#);
        mock.queue_response(r#"{"b":2}"#);
        let mut pipe = Pipe::new(mock);

        assert_eq!(pipe.try_read_line().unwrap().as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(pipe.try_read_line().unwrap().as_deref(), Some(r#"{"b":2}"#));
        assert_eq!(pipe.try_read_line().unwrap(), None);
    }
}
