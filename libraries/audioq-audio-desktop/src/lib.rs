//! AudioQ - Desktop Audio Collaborators
//!
//! Desktop implementations of the `audioq-playback` collaborator seams:
//! - [`CpalSink`]: audio output through the system's default device
//! - [`SymphoniaOpener`] / [`LocalCueSource`]: streaming decode of
//!   wav/flac/mp3/ogg cue files, resampled to the device rate
//!
//! # Example
//!
//! ```rust,no_run
//! use audioq_audio_desktop::desktop_engine;
//! use audioq_playback::EngineConfig;
//!
//! let mut engine = desktop_engine(EngineConfig::default())?;
//! engine.add_cue("Opening", "/show/opening.wav")?;
//! engine.play_next()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod output;
pub mod sources;

pub use error::{AudioError, Result};
pub use output::CpalSink;
pub use sources::local::{LocalCueSource, SymphoniaOpener};

use audioq_playback::{CueEngine, EngineConfig};

/// Build a ready-to-use engine wired to the default output device.
///
/// The decoder targets the device's native sample rate, so conversion
/// happens once at decode time instead of at the device boundary.
pub fn desktop_engine(config: EngineConfig) -> Result<CueEngine> {
    let sink = CpalSink::new()?;
    let opener = SymphoniaOpener::new(sink.sample_rate());
    Ok(CueEngine::new(config, Box::new(opener), Box::new(sink)))
}
