//! Error types for the cue engine

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Engine errors
///
/// Every engine operation reports failure through this type; nothing in the
/// engine aborts the process.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Source file could not be opened or decoded
    #[error("invalid audio source: {0}")]
    InvalidSource(String),

    /// Cue index outside the queue
    #[error("cue index {index} out of range for {len} cues")]
    IndexOutOfRange { index: usize, len: usize },

    /// The queue is empty or the play cursor is past the last cue
    #[error("no more cues to play")]
    NoMoreCues,

    /// Buffer size must be at least one frame
    #[error("invalid buffer size: {0} frames")]
    InvalidBufferSize(u32),

    /// File system or audio device failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Project could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Project file content is malformed
    #[error("malformed project file: {0}")]
    Parse(String),

    /// Project file uses an unsupported format version
    #[error("unsupported project file version {found} (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
}

impl From<std::io::Error> for PlaybackError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
