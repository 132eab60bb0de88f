//! Cue engine - core orchestration
//!
//! One [`CueEngine`] instance owns the whole engine state: the cue queue,
//! the settings value, the play cursor, the notification bus, and the
//! single active stream. It is constructed once at process start and handed
//! to collaborators; there are no globals.
//!
//! All mutating calls take `&mut self`, so the single-writer discipline is
//! enforced by ownership rather than locks. The only other running context
//! is the streaming thread spawned by [`CueEngine::play_next`], which owns
//! the open source and output stream for one cue and is the only place
//! blocking audio writes happen.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::error::{PlaybackError, Result};
use crate::notify::{NotificationBus, Subscription};
use crate::project;
use crate::queue::CueList;
use crate::settings::Settings;
use crate::sink::{AudioOutputSink, OutputStream};
use crate::source::{CueSource, SourceOpener};
use crate::types::{Cue, CueSnapshot, EngineConfig, EngineState};

/// Handle to the one active streaming thread.
struct ActiveStream {
    /// Set by the control path to cancel the stream
    stop: Arc<AtomicBool>,
    /// Set by the streaming thread when it exits on its own
    finished: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// The cue playback engine.
///
/// Exposes the full operator surface: queue edits, transport control,
/// settings, project persistence, and change subscriptions.
pub struct CueEngine {
    cues: CueList,
    settings: Settings,
    cursor: Option<usize>,
    bus: NotificationBus,
    opener: Box<dyn SourceOpener>,
    sink: Box<dyn AudioOutputSink>,
    active: Option<ActiveStream>,
}

impl CueEngine {
    /// Create an engine with an empty queue.
    pub fn new(
        config: EngineConfig,
        opener: Box<dyn SourceOpener>,
        sink: Box<dyn AudioOutputSink>,
    ) -> Self {
        let settings = match config.settings.validate() {
            Ok(()) => config.settings,
            Err(err) => {
                warn!(%err, "initial settings rejected, using defaults");
                Settings::default()
            }
        };

        Self {
            cues: CueList::new(),
            settings,
            cursor: None,
            bus: NotificationBus::new(config.event_queue_capacity),
            opener,
            sink,
            active: None,
        }
    }

    // ===== Queue =====

    /// Append a cue backed by the audio file at `source_path`.
    ///
    /// The source is opened once to prove it decodes, then dropped; playback
    /// re-opens it, since decoded sources are consumed by streaming. Returns
    /// the new cue's index.
    pub fn add_cue(
        &mut self,
        name: impl Into<String>,
        source_path: impl Into<PathBuf>,
    ) -> Result<usize> {
        let source_path = source_path.into();
        self.opener.open(&source_path)?;

        let index = self.cues.push(Cue::new(name, source_path));
        // An exhausted (or empty) cursor points at the first new material
        if self.cursor.is_none() {
            self.cursor = Some(index);
        }
        self.bus.publish_cue_list();
        Ok(index)
    }

    /// Move the cue at `from` so it ends up at `to` (stable move).
    pub fn move_cue(&mut self, from: usize, to: usize) -> Result<()> {
        self.cues.move_cue(from, to)?;

        // The cursor follows the cue it was pointing at
        self.cursor = self.cursor.map(|cursor| {
            if cursor == from {
                to
            } else if from < cursor && cursor <= to {
                cursor - 1
            } else if to <= cursor && cursor < from {
                cursor + 1
            } else {
                cursor
            }
        });

        self.bus.publish_cue_list();
        Ok(())
    }

    /// Remove the cue at `index`; later cues shift down by one.
    pub fn remove_cue(&mut self, index: usize) -> Result<()> {
        self.cues.remove(index)?;

        self.cursor = match self.cursor {
            Some(cursor) if index < cursor => Some(cursor - 1),
            // Removing the pointed-at cue leaves the cursor in place: the
            // next cue slides in, unless the removal emptied the tail
            Some(cursor) if cursor < self.cues.len() => Some(cursor),
            _ => None,
        };

        self.bus.publish_cue_list();
        Ok(())
    }

    /// Flip the UI-only selection flag on one cue. No event is emitted;
    /// the flag is the presentation layer's own state.
    pub fn set_selected(&mut self, index: usize, selected: bool) -> Result<()> {
        self.cues.set_selected(index, selected)
    }

    /// Owned, ordered view of the queue at a single point in time.
    pub fn snapshot(&self) -> CueSnapshot {
        self.cues.snapshot()
    }

    pub fn cue_count(&self) -> usize {
        self.cues.len()
    }

    // ===== Transport =====

    /// Current transport state.
    pub fn state(&self) -> EngineState {
        match &self.active {
            Some(stream) if !stream.finished.load(Ordering::Relaxed) => EngineState::Playing,
            _ => EngineState::Idle,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state() == EngineState::Playing
    }

    /// Index of the cue the next [`play_next`](Self::play_next) will fire,
    /// or `None` when the queue is empty or exhausted.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Begin streaming the cue under the cursor.
    ///
    /// Any stream already active is halted first, so at most one stream
    /// ever runs. On success the cursor advances past the played cue
    /// (`None` past the last one). If the cue's source fails to open, or
    /// the output sink cannot be opened, the cursor stays put so the
    /// operator can retry the same cue or remove it.
    pub fn play_next(&mut self) -> Result<()> {
        self.stop_playing();

        let index = self.cursor.ok_or(PlaybackError::NoMoreCues)?;
        let cue = self.cues.get(index).ok_or(PlaybackError::NoMoreCues)?;

        let source = self.opener.open(&cue.source_path)?;
        let spec = source.spec();
        let buffer_frames = self.settings.buffer_size_frames;
        let stream = self.sink.open(buffer_frames, spec)?;

        // The chunk size is fixed here; a later settings change only
        // affects streams started after it
        let chunk_samples = spec.samples_per_chunk(buffer_frames);
        let cue_name = cue.name.clone();

        let stop = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let thread_finished = Arc::clone(&finished);

        let handle = thread::spawn(move || {
            stream_cue(&cue_name, source, stream, chunk_samples, &thread_stop);
            thread_finished.store(true, Ordering::Relaxed);
        });

        debug!(index, "cue stream started");
        self.active = Some(ActiveStream {
            stop,
            finished,
            handle,
        });
        self.cursor = if index + 1 < self.cues.len() {
            Some(index + 1)
        } else {
            None
        };
        Ok(())
    }

    /// Cancel the active stream, if any; a no-op when idle.
    ///
    /// The streaming thread checks the stop flag at every chunk boundary
    /// and a sink write blocks for at most one device buffer period, so
    /// the join completes in bounded time regardless of decode progress.
    pub fn stop_playing(&mut self) {
        if let Some(stream) = self.active.take() {
            stream.stop.store(true, Ordering::Relaxed);
            if stream.handle.join().is_err() {
                warn!("streaming thread panicked");
            }
        }
    }

    /// Point the cursor at `index` without touching playback.
    pub fn jump_to(&mut self, index: usize) -> Result<()> {
        if index >= self.cues.len() {
            return Err(PlaybackError::IndexOutOfRange {
                index,
                len: self.cues.len(),
            });
        }
        self.cursor = Some(index);
        Ok(())
    }

    /// Rewind the cursor to the top of the queue.
    pub fn reset_cursor(&mut self) {
        self.cursor = if self.cues.is_empty() { None } else { Some(0) };
    }

    // ===== Settings =====

    /// Replace the settings value.
    ///
    /// Rejected settings leave the prior value untouched. The new buffer
    /// size governs streams started by later [`play_next`](Self::play_next)
    /// calls; a stream already in flight keeps its original chunking.
    pub fn set_settings(&mut self, settings: Settings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        self.bus.publish_settings(&self.settings);
        Ok(())
    }

    /// Replace only the project name, leaving the buffer size alone.
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.settings = Settings {
            project_name: name.clone(),
            buffer_size_frames: self.settings.buffer_size_frames,
        };
        self.bus.publish_name(&name);
    }

    /// Current settings, computed on demand from the single source of truth.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn project_name(&self) -> &str {
        &self.settings.project_name
    }

    // ===== Persistence =====

    /// Serialize the queue and settings to a `.audioq` project file.
    pub fn save_project(&self, path: impl AsRef<Path>) -> Result<()> {
        project::save(path.as_ref(), &self.settings, self.cues.cues())
    }

    /// Replace the queue and settings from a `.audioq` project file.
    ///
    /// All-or-nothing: any failure leaves the current queue and settings
    /// untouched. On success playback halts, the cursor rewinds to the top
    /// of the loaded queue, and all three change events fire.
    pub fn load_project(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let data = project::load(path.as_ref())?;

        self.stop_playing();
        self.cues.replace(data.cues);
        self.settings = data.settings;
        self.cursor = if self.cues.is_empty() { None } else { Some(0) };

        self.bus.publish_cue_list();
        self.bus.publish_settings(&self.settings);
        self.bus.publish_name(&self.settings.project_name);
        Ok(())
    }

    // ===== Subscriptions =====

    /// Observe project-name changes.
    pub fn subscribe_name(&mut self) -> Subscription<String> {
        self.bus.subscribe_name()
    }

    /// Observe settings changes.
    pub fn subscribe_settings(&mut self) -> Subscription<Settings> {
        self.bus.subscribe_settings()
    }

    /// Observe cue list changes; re-snapshot on each event.
    pub fn subscribe_cue_list(&mut self) -> Subscription<()> {
        self.bus.subscribe_cue_list()
    }
}

impl Drop for CueEngine {
    fn drop(&mut self) {
        self.stop_playing();
    }
}

/// Body of the streaming thread: the only context that blocks on audio I/O.
fn stream_cue(
    name: &str,
    mut source: Box<dyn CueSource>,
    mut stream: Box<dyn OutputStream>,
    chunk_samples: usize,
    stop: &AtomicBool,
) {
    let mut chunk = vec![0.0f32; chunk_samples];
    loop {
        if stop.load(Ordering::Relaxed) {
            stream.discard();
            debug!(cue = name, "cue stream cancelled");
            return;
        }

        let read = match source.read_samples(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) => {
                warn!(cue = name, %err, "decode failed mid-stream");
                stream.discard();
                return;
            }
        };

        if let Err(err) = stream.write(&chunk[..read]) {
            warn!(cue = name, %err, "output write failed");
            return;
        }
    }

    // Natural end: let what is already queued play out
    if let Err(err) = stream.drain() {
        warn!(cue = name, %err, "output drain failed");
    }
    debug!(cue = name, "cue stream finished");
}
