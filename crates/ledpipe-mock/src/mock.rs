use std::collections::VecDeque;

use bytes::Bytes;
use ledpipe_frame::{Codec, CodecError, JsonCodec};
use ledpipe_transport::{Result, Transport};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, trace};

/// Callback invoked with the exact text of every send.
pub type SendObserver = Box<dyn FnMut(&str) + Send>;

/// Stand-in for a real controller link.
///
/// Nothing leaves the process. Sent text is handed to the observer, then
/// every JSON object line in it is shallow-merged into the accumulated
/// state (last write wins per top-level key). Reads are served from a FIFO
/// of queued responses, one whole entry per poll.
///
/// The connection flag only changes through [`MockTransport::set_connected`]
/// and `close()`; sends and reads never fail.
pub struct MockTransport {
    responses: VecDeque<String>,
    state: Map<String, Value>,
    sent: Vec<String>,
    observer: Option<SendObserver>,
    connected: bool,
    codec: JsonCodec,
}

impl MockTransport {
    /// Create a connected mock with no observer.
    pub fn new() -> Self {
        Self {
            responses: VecDeque::new(),
            state: Map::new(),
            sent: Vec::new(),
            observer: None,
            connected: true,
            codec: JsonCodec,
        }
    }

    /// Create a connected mock that reports every send to `observer`.
    pub fn with_observer<F>(observer: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        let mut mock = Self::new();
        mock.set_send_observer(observer);
        mock
    }

    /// Install (or replace) the send observer.
    pub fn set_send_observer<F>(&mut self, observer: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.observer = Some(Box::new(observer));
    }

    /// Remove the send observer.
    pub fn clear_send_observer(&mut self) {
        self.observer = None;
    }

    /// Record `text` as sent.
    ///
    /// The observer fires first and always, even when `text` is not JSON.
    pub fn send(&mut self, text: &str) {
        if let Some(observer) = self.observer.as_mut() {
            observer(text);
        }
        self.sent.push(text.to_string());
        self.accumulate(text);
    }

    /// Queue a raw response line (without delimiter).
    pub fn queue_response(&mut self, line: impl Into<String>) {
        self.responses.push_back(line.into());
    }

    /// Serialize `value` and queue it as a response line.
    pub fn queue_value<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> std::result::Result<(), CodecError> {
        let line = self.codec.encode(value)?;
        self.responses.push_back(line);
        Ok(())
    }

    /// Dequeue the next response as text, bypassing framing.
    pub fn read_line(&mut self) -> Option<String> {
        self.responses.pop_front()
    }

    /// Number of queued responses not yet read.
    pub fn pending_responses(&self) -> usize {
        self.responses.len()
    }

    /// Drop all queued responses.
    pub fn clear_responses(&mut self) {
        self.responses.clear();
    }

    /// State merged from every JSON object sent so far.
    pub fn accumulated_state(&self) -> &Map<String, Value> {
        &self.state
    }

    /// A single accumulated value.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    /// A single accumulated value converted to `T`.
    ///
    /// Returns `None` when the key is missing or holds a different shape.
    pub fn value_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.state
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Whether `key` has been set by any send.
    pub fn has_value(&self, key: &str) -> bool {
        self.state.contains_key(key)
    }

    /// Forget the accumulated state.
    pub fn clear_state(&mut self) {
        self.state.clear();
    }

    /// Every chunk of text sent so far, in order.
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    /// Forget the send log.
    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }

    /// Simulate the link going up or down.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    fn accumulate(&mut self, text: &str) {
        for line in text.lines().map(str::trim) {
            if !line.starts_with('{') {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(Value::Object(map)) => {
                    trace!(keys = map.len(), "merging sent object into state");
                    for (key, value) in map {
                        self.state.insert(key, value);
                    }
                }
                Ok(_) => {}
                Err(err) => debug!(error = %err, "sent line is not json; state unchanged"),
            }
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(bytes);
        self.send(&text);
        Ok(())
    }

    /// Returns the next queued response whole, newline-terminated.
    ///
    /// `max` is ignored so a queued entry is never split across polls.
    fn poll_readable(&mut self, _max: usize) -> Result<Bytes> {
        let Some(mut line) = self.responses.pop_front() else {
            return Ok(Bytes::new());
        };
        if !line.ends_with('\n') {
            line.push('\n');
        }
        Ok(Bytes::from(line))
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    /// Full reset: disconnects and drops queued responses, state and send log.
    fn close(&mut self) {
        self.connected = false;
        self.responses.clear();
        self.state.clear();
        self.sent.clear();
    }

    fn transport_name(&self) -> &'static str {
        "mock"
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("connected", &self.connected)
            .field("pending_responses", &self.responses.len())
            .field("state", &self.state)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;

    fn recording_mock() -> (MockTransport, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mock = MockTransport::with_observer(move |text| {
            sink.lock().unwrap().push(text.to_string());
        });
        (mock, seen)
    }

    #[test]
    fn last_write_wins() {
        let mut mock = MockTransport::new();
        mock.send(r#"{"bri":100}"#);
        mock.send(r#"{"bri":200}"#);

        assert_eq!(Value::Object(mock.accumulated_state().clone()), json!({"bri": 200}));
    }

    #[test]
    fn keys_union_across_sends() {
        let mut mock = MockTransport::new();
        mock.send(r#"{"on":true}"#);
        mock.send(r#"{"bri":5}"#);

        assert_eq!(
            Value::Object(mock.accumulated_state().clone()),
            json!({"on": true, "bri": 5})
        );
    }

    #[test]
    fn merge_is_shallow() {
        let mut mock = MockTransport::new();
        mock.send(r#"{"seg":{"id":0,"fx":1}}"#);
        mock.send(r#"{"seg":{"id":1}}"#);

        assert_eq!(mock.value("seg"), Some(&json!({"id": 1})));
    }

    #[test]
    fn malformed_payload_reaches_observer_but_not_state() {
        let (mut mock, seen) = recording_mock();
        mock.send(r#"{"on":true}"#);
        mock.send("not json");
        mock.send("{broken");

        assert_eq!(
            *seen.lock().unwrap(),
            vec![r#"{"on":true}"#, "not json", "{broken"]
        );
        assert_eq!(Value::Object(mock.accumulated_state().clone()), json!({"on": true}));
    }

    #[test]
    fn non_object_json_is_ignored() {
        let mut mock = MockTransport::new();
        mock.send("[1,2,3]");
        mock.send("42");
        assert!(mock.accumulated_state().is_empty());
        assert_eq!(mock.sent().len(), 2);
    }

    #[test]
    fn multi_line_write_merges_each_line() {
        let mut mock = MockTransport::new();
        mock.write(b"{\"on\":true}\n{\"bri\":7}\n").unwrap();

        assert_eq!(
            Value::Object(mock.accumulated_state().clone()),
            json!({"on": true, "bri": 7})
        );
        assert_eq!(mock.sent(), &["{\"on\":true}\n{\"bri\":7}\n".to_string()]);
    }

    #[test]
    fn responses_are_fifo() {
        let mut mock = MockTransport::new();
        mock.queue_response(r#"{"a":1}"#);
        mock.queue_response(r#"{"b":2}"#);

        assert_eq!(mock.read_line().as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(mock.read_line().as_deref(), Some(r#"{"b":2}"#));
        assert_eq!(mock.read_line(), None);
    }

    #[test]
    fn poll_delivers_whole_terminated_entries() {
        let mut mock = MockTransport::new();
        mock.queue_response(r#"{"a":1}"#);
        mock.queue_response("{\"b\":2}\n");

        assert_eq!(mock.poll_readable(2).unwrap().as_ref(), b"{\"a\":1}\n");
        assert_eq!(mock.poll_readable(2).unwrap().as_ref(), b"{\"b\":2}\n");
        assert!(mock.poll_readable(2).unwrap().is_empty());
    }

    #[test]
    fn queue_value_serializes_through_codec() {
        let mut mock = MockTransport::new();
        mock.queue_value(&json!({"on": true, "bri": 128, "ps": 2}))
            .expect("json value should serialize");

        let line = mock.read_line().unwrap();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, json!({"on": true, "bri": 128, "ps": 2}));
    }

    #[test]
    fn typed_accessors() {
        let mut mock = MockTransport::new();
        mock.send(r#"{"on":true,"bri":42}"#);

        assert!(mock.has_value("bri"));
        assert!(!mock.has_value("ps"));
        assert_eq!(mock.value_as::<u8>("bri"), Some(42));
        assert_eq!(mock.value_as::<bool>("on"), Some(true));
        assert_eq!(mock.value_as::<bool>("bri"), None);
        assert_eq!(mock.value_as::<u8>("ps"), None);
    }

    #[test]
    fn connection_flag_is_togglable() {
        let mut mock = MockTransport::new();
        assert!(mock.is_connected());

        mock.set_connected(false);
        assert!(!mock.is_connected());
        mock.send(r#"{"on":true}"#);
        assert!(mock.has_value("on"));

        mock.set_connected(true);
        assert!(mock.is_connected());
    }

    #[test]
    fn close_is_a_full_reset() {
        let mut mock = MockTransport::new();
        mock.send(r#"{"on":true}"#);
        mock.queue_response(r#"{"a":1}"#);

        mock.close();
        assert!(!mock.is_connected());
        assert!(mock.accumulated_state().is_empty());
        assert_eq!(mock.pending_responses(), 0);
        assert!(mock.sent().is_empty());

        mock.close();
        assert!(!mock.is_connected());
    }

    #[test]
    fn clear_helpers_touch_only_their_target() {
        let mut mock = MockTransport::new();
        mock.send(r#"{"on":true}"#);
        mock.queue_response("x");

        mock.clear_state();
        assert!(mock.accumulated_state().is_empty());
        assert_eq!(mock.pending_responses(), 1);

        mock.clear_responses();
        assert_eq!(mock.pending_responses(), 0);
        assert_eq!(mock.sent().len(), 1);
    }

    #[test]
    fn observer_can_be_replaced_and_removed() {
        let (mut mock, first) = recording_mock();
        mock.send("one");

        let second = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&second);
        mock.set_send_observer(move |text| sink.lock().unwrap().push(text.to_string()));
        mock.send("two");

        mock.clear_send_observer();
        mock.send("three");

        assert_eq!(*first.lock().unwrap(), vec!["one"]);
        assert_eq!(*second.lock().unwrap(), vec!["two"]);
        assert_eq!(mock.sent().len(), 3);
    }
}
