/// Errors that can occur in pipe operations.
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] ledpipe_transport::TransportError),

    /// Framing error.
    #[error("frame error: {0}")]
    Frame(#[from] ledpipe_frame::FrameError),

    /// Value could not be encoded or a line could not be decoded.
    #[error("codec error: {0}")]
    Codec(#[from] ledpipe_frame::CodecError),
}

impl PipeError {
    /// Returns true if the link is gone and the pipe should be rebuilt.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, PipeError::Transport(err) if err.is_disconnect())
    }
}

pub type Result<T> = std::result::Result<T, PipeError>;
