//! Shared scripted collaborators for engine tests.
//!
//! Real shows use the CPAL sink and Symphonia opener from
//! `audioq-audio-desktop`; tests script the same seams instead.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use audioq_playback::{
    AudioOutputSink, CueEngine, CueSource, EngineState, OutputStream, PlaybackError, Result,
    SignalSpec, SourceOpener,
};

/// Source yielding `chunks` full buffers of silence, pausing `delay` before
/// each read so tests can act while a stream is in flight.
pub struct ScriptedSource {
    chunks: usize,
    delay: Duration,
}

impl CueSource for ScriptedSource {
    fn spec(&self) -> SignalSpec {
        SignalSpec::new(48000, 2)
    }

    fn read_samples(&mut self, buffer: &mut [f32]) -> Result<usize> {
        if self.chunks == 0 {
            return Ok(0);
        }
        self.chunks -= 1;
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        buffer.fill(0.0);
        Ok(buffer.len())
    }
}

#[derive(Default)]
pub struct OpenerState {
    /// Paths opened, in order
    pub opened: Vec<PathBuf>,
    /// Paths that fail with `InvalidSource` when opened
    pub failing: HashSet<PathBuf>,
}

/// Opener producing scripted sources; records every open.
pub struct ScriptedOpener {
    chunks: usize,
    delay: Duration,
    state: Arc<Mutex<OpenerState>>,
}

impl ScriptedOpener {
    pub fn new(chunks: usize, delay: Duration) -> (Self, Arc<Mutex<OpenerState>>) {
        let state = Arc::new(Mutex::new(OpenerState::default()));
        (
            Self {
                chunks,
                delay,
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

impl SourceOpener for ScriptedOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn CueSource>> {
        let mut state = self.state.lock().unwrap();
        if state.failing.contains(path) {
            return Err(PlaybackError::InvalidSource(path.display().to_string()));
        }
        state.opened.push(path.to_path_buf());
        Ok(Box::new(ScriptedSource {
            chunks: self.chunks,
            delay: self.delay,
        }))
    }
}

#[derive(Default)]
pub struct SinkLog {
    /// Buffer size passed to each `open`, in order
    pub open_frames: Vec<u32>,
    /// Sample count of every write, in order across all streams
    pub writes: Vec<usize>,
    pub drains: usize,
    pub discards: usize,
}

/// Sink recording opens, write sizes, drains, and discards.
pub struct RecordingSink {
    log: Arc<Mutex<SinkLog>>,
}

impl RecordingSink {
    pub fn new() -> (Self, Arc<Mutex<SinkLog>>) {
        let log = Arc::new(Mutex::new(SinkLog::default()));
        (
            Self {
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

impl AudioOutputSink for RecordingSink {
    fn open(&self, buffer_frames: u32, _spec: SignalSpec) -> Result<Box<dyn OutputStream>> {
        let mut log = self.log.lock().unwrap();
        log.open_frames.push(buffer_frames);
        Ok(Box::new(RecordingStream {
            log: Arc::clone(&self.log),
        }))
    }
}

struct RecordingStream {
    log: Arc<Mutex<SinkLog>>,
}

impl OutputStream for RecordingStream {
    fn write(&mut self, samples: &[f32]) -> Result<()> {
        self.log.lock().unwrap().writes.push(samples.len());
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        self.log.lock().unwrap().drains += 1;
        Ok(())
    }

    fn discard(&mut self) {
        self.log.lock().unwrap().discards += 1;
    }
}

/// Block until the active stream finishes on its own.
pub fn wait_idle(engine: &CueEngine, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while engine.state() == EngineState::Playing {
        if Instant::now() > deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    true
}
