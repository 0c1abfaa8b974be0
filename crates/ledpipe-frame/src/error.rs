/// Errors that can occur while framing lines.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A line grew past the configured cap before its delimiter arrived.
    /// The oversized line is dropped; framing resumes after its delimiter.
    #[error("line too long ({size} bytes, max {max})")]
    LineTooLong { size: usize, max: usize },
}

/// Errors raised at the codec boundary.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The value could not be serialized.
    #[error("failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),

    /// A received line did not match the requested shape.
    #[error("failed to decode line: {source}")]
    Decode {
        line: String,
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, FrameError>;
