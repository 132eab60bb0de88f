//! AudioQ - Cue Playback Engine
//!
//! Platform-agnostic cue-queue and playback engine for live-event audio:
//! an operator pre-loads audio files as an ordered list of cues and fires
//! them one at a time during a show.
//!
//! This crate provides:
//! - Ordered, mutable cue queue (add / stable move / remove / snapshot)
//! - Transport driving at most one active stream (`play_next` / `stop_playing`)
//! - Project settings (name + output buffer size) with validation
//! - Change notifications with per-observer bounded queues
//! - Transactional `.audioq` project persistence
//!
//! # Architecture
//!
//! `audioq-playback` is completely platform-agnostic: no audio backend, no
//! codec dependencies. The device boundary is the [`AudioOutputSink`] trait
//! and the codec boundary is the [`SourceOpener`]/[`CueSource`] pair;
//! desktop implementations (CPAL, Symphonia) live in
//! `audioq-audio-desktop`.
//!
//! A single [`CueEngine`] value owns all state. Mutations go through
//! `&mut self`, which serializes operator actions by construction; the one
//! background streaming thread is the only place blocking audio writes
//! happen, so the control path never stalls on hardware backpressure.
//!
//! # Example
//!
//! ```
//! use audioq_playback::{
//!     AudioOutputSink, CueEngine, CueSource, EngineConfig, OutputStream,
//!     PlaybackError, Result, SignalSpec, SourceOpener,
//! };
//! use std::path::Path;
//!
//! // Stand-in collaborators; real shows use the desktop crate's
//! // CPAL sink and Symphonia opener.
//! struct Tone(usize);
//!
//! impl CueSource for Tone {
//!     fn spec(&self) -> SignalSpec {
//!         SignalSpec::new(48000, 2)
//!     }
//!     fn read_samples(&mut self, buffer: &mut [f32]) -> Result<usize> {
//!         let n = self.0.min(buffer.len());
//!         buffer[..n].fill(0.0);
//!         self.0 -= n;
//!         Ok(n)
//!     }
//! }
//!
//! struct ToneOpener;
//!
//! impl SourceOpener for ToneOpener {
//!     fn open(&self, _path: &Path) -> Result<Box<dyn CueSource>> {
//!         Ok(Box::new(Tone(9600)))
//!     }
//! }
//!
//! struct NullSink;
//! struct NullStream;
//!
//! impl OutputStream for NullStream {
//!     fn write(&mut self, _samples: &[f32]) -> Result<()> {
//!         Ok(())
//!     }
//!     fn drain(&mut self) -> Result<()> {
//!         Ok(())
//!     }
//!     fn discard(&mut self) {}
//! }
//!
//! impl AudioOutputSink for NullSink {
//!     fn open(&self, _buffer_frames: u32, _spec: SignalSpec) -> Result<Box<dyn OutputStream>> {
//!         Ok(Box::new(NullStream))
//!     }
//! }
//!
//! let mut engine = CueEngine::new(
//!     EngineConfig::default(),
//!     Box::new(ToneOpener),
//!     Box::new(NullSink),
//! );
//!
//! let cue_list = engine.subscribe_cue_list();
//!
//! engine.add_cue("Opening", "/show/opening.wav")?;
//! assert!(cue_list.try_recv().is_some());
//!
//! engine.play_next()?;
//! engine.stop_playing();
//!
//! // The queue is exhausted now
//! assert!(matches!(engine.play_next(), Err(PlaybackError::NoMoreCues)));
//! # Ok::<(), PlaybackError>(())
//! ```

mod engine;
mod error;
mod notify;
pub mod project;
mod queue;
mod settings;
mod sink;
mod source;
pub mod types;

// Public exports
pub use engine::CueEngine;
pub use error::{PlaybackError, Result};
pub use notify::{NotificationBus, Subscription, DEFAULT_QUEUE_CAPACITY};
pub use project::FORMAT_VERSION;
pub use queue::CueList;
pub use settings::{Settings, DEFAULT_BUFFER_FRAMES};
pub use sink::{AudioOutputSink, OutputStream};
pub use source::{CueSource, SourceOpener};
pub use types::{Cue, CueSnapshot, EngineConfig, EngineState, SignalSpec};
