use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;

/// Converts between typed values and single wire lines.
///
/// Encoded text must not contain a raw newline; the delimiter is added by
/// the sender.
pub trait Codec {
    /// Serialize `value` into one line of text (no delimiter).
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, CodecError>;

    /// Deserialize one received line into `T`.
    fn decode<T: DeserializeOwned>(&self, line: &str) -> Result<T, CodecError>;
}

/// Compact JSON codec backed by `serde_json`.
///
/// Unknown fields are ignored on decode unless the target type opts into
/// `#[serde(deny_unknown_fields)]`, so controller firmware can add keys
/// without breaking callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, CodecError> {
        serde_json::to_string(value).map_err(CodecError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, line: &str) -> Result<T, CodecError> {
        serde_json::from_str(line).map_err(|source| CodecError::Decode {
            line: line.to_string(),
            source,
        })
    }
}
