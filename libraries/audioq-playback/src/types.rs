//! Core types for the cue engine

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::notify::DEFAULT_QUEUE_CAPACITY;
use crate::settings::Settings;

/// One schedulable audio item in the cue queue.
///
/// A cue's position in the [`CueList`](crate::CueList) is its index; the
/// list keeps positions dense through every mutation, so there is no stored
/// index field to fall out of sync.
///
/// The source is identified by path rather than by an open decoder handle:
/// decoded sources are consumed by streaming, so playback re-opens the path
/// each time the cue fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    /// Operator-facing name shown in the cue table
    pub name: String,

    /// Path to the audio file backing this cue
    pub source_path: PathBuf,

    /// UI-only selection flag; ignored by the engine and never persisted
    #[serde(skip)]
    pub selected: bool,
}

impl Cue {
    /// Create an unselected cue.
    pub fn new(name: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source_path: source_path.into(),
            selected: false,
        }
    }
}

/// Owned, ordered view of the cue queue at a single point in time.
pub type CueSnapshot = Vec<Cue>;

/// PCM stream description.
///
/// Sources yield interleaved f32 samples in [-1.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSpec {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
}

impl SignalSpec {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Interleaved samples per sink write for a given frame count.
    pub fn samples_per_chunk(&self, frames: u32) -> usize {
        frames as usize * self.channels as usize
    }
}

/// Engine transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No active stream
    Idle,
    /// Exactly one active stream is writing to the output sink
    Playing,
}

/// Configuration for a new engine instance
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Initial project settings
    pub settings: Settings,

    /// Capacity of each observer's notification queue; when a queue is
    /// full the oldest queued event is dropped
    pub event_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            event_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}
