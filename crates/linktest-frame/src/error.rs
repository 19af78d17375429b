/// Errors from frame validation and reference construction.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    /// No sync marker anywhere in the received buffer.
    #[error("no sync marker in received frame")]
    MarkerMissing,

    /// Fewer bytes after the marker than the reference payload needs.
    #[error("frame truncated after marker ({got} bytes, need {need})")]
    Truncated { got: usize, need: usize },

    /// A byte after the marker differs from the reference payload.
    #[error("payload mismatch at offset {offset}")]
    ContentMismatch { offset: usize },

    /// Reference content has no sync marker within its preamble.
    #[error("reference preamble missing sync marker")]
    PreambleMissingMarker,

    /// Reference content shorter than its declared preamble.
    #[error("reference too short ({len} bytes, preamble {preamble})")]
    ReferenceTooShort { len: usize, preamble: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
