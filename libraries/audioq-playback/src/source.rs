//! Decodable audio source abstraction
//!
//! The engine never touches containers or codecs directly; it pulls decoded
//! PCM from a [`CueSource`] obtained through a [`SourceOpener`]. Desktop
//! builds get a Symphonia-backed implementation from the companion crate.

use std::path::Path;

use crate::error::Result;
use crate::types::SignalSpec;

/// A lazy, finite stream of decoded PCM.
///
/// Sources are not restartable: once `read_samples` returns 0 the stream is
/// exhausted, and the cue must be re-opened through its [`SourceOpener`] to
/// play again.
pub trait CueSource: Send {
    /// Stream description; fixed for the lifetime of the source.
    fn spec(&self) -> SignalSpec;

    /// Fill `buffer` with interleaved samples.
    ///
    /// Returns the number of samples written, which may be less than the
    /// buffer length near the end of the stream; 0 means end of stream.
    fn read_samples(&mut self, buffer: &mut [f32]) -> Result<usize>;
}

/// Opens and validates cue sources by path.
pub trait SourceOpener: Send {
    /// Open `path` for decoding.
    ///
    /// Fails with [`PlaybackError::InvalidSource`](crate::PlaybackError)
    /// when the file is missing, unreadable, or not decodable audio.
    fn open(&self, path: &Path) -> Result<Box<dyn CueSource>>;
}
