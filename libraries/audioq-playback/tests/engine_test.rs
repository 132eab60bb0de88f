//! Engine integration tests
//!
//! Exercises the full operator surface against scripted collaborators:
//! transport sequencing, failure recovery, settings handover, notification
//! flow, and project persistence.

mod common;

use std::time::Duration;

use audioq_playback::{CueEngine, EngineConfig, EngineState, PlaybackError, Settings};
use common::{wait_idle, RecordingSink, ScriptedOpener};
use tempfile::TempDir;

const IDLE_TIMEOUT: Duration = Duration::from_secs(2);

fn engine_with(
    chunks: usize,
    delay: Duration,
) -> (
    CueEngine,
    std::sync::Arc<std::sync::Mutex<common::OpenerState>>,
    std::sync::Arc<std::sync::Mutex<common::SinkLog>>,
) {
    let (opener, opener_state) = ScriptedOpener::new(chunks, delay);
    let (sink, sink_log) = RecordingSink::new();
    let engine = CueEngine::new(EngineConfig::default(), Box::new(opener), Box::new(sink));
    (engine, opener_state, sink_log)
}

fn add_cues(engine: &mut CueEngine, names: &[&str]) {
    for name in names {
        engine
            .add_cue(*name, format!("/show/{name}.wav"))
            .expect("add_cue failed");
    }
}

// ===== Transport =====

#[test]
fn plays_cues_in_order_exactly_once_then_reports_exhaustion() {
    let (mut engine, opener_state, _) = engine_with(1, Duration::ZERO);
    add_cues(&mut engine, &["a", "b", "c"]);

    for _ in 0..3 {
        engine.play_next().unwrap();
        assert!(wait_idle(&engine, IDLE_TIMEOUT));
    }

    // add_cue validation opens each path once; playback opens each again
    let opened: Vec<String> = opener_state
        .lock()
        .unwrap()
        .opened
        .iter()
        .skip(3)
        .map(|p| p.display().to_string())
        .collect();
    assert_eq!(opened, vec!["/show/a.wav", "/show/b.wav", "/show/c.wav"]);

    assert!(matches!(engine.play_next(), Err(PlaybackError::NoMoreCues)));
    assert_eq!(engine.state(), EngineState::Idle);
}

#[test]
fn play_while_playing_halts_the_previous_stream() {
    let (mut engine, _, sink_log) = engine_with(200, Duration::from_millis(10));
    add_cues(&mut engine, &["a", "b"]);

    engine.play_next().unwrap();
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(engine.state(), EngineState::Playing);

    engine.play_next().unwrap();
    {
        let log = sink_log.lock().unwrap();
        assert_eq!(log.open_frames.len(), 2);
        // The first stream was cancelled, not played out
        assert_eq!(log.discards, 1);
        assert_eq!(log.drains, 0);
    }

    engine.stop_playing();
    assert_eq!(engine.state(), EngineState::Idle);
}

#[test]
fn stop_discards_queued_audio_and_is_bounded() {
    let (mut engine, _, sink_log) = engine_with(200, Duration::from_millis(10));
    add_cues(&mut engine, &["a"]);

    engine.play_next().unwrap();
    std::thread::sleep(Duration::from_millis(25));

    let before = std::time::Instant::now();
    engine.stop_playing();
    assert!(before.elapsed() < Duration::from_secs(1));

    let log = sink_log.lock().unwrap();
    assert_eq!(log.discards, 1);
    assert_eq!(log.drains, 0);
}

#[test]
fn natural_finish_drains_the_sink() {
    let (mut engine, _, sink_log) = engine_with(2, Duration::ZERO);
    add_cues(&mut engine, &["a"]);

    engine.play_next().unwrap();
    assert!(wait_idle(&engine, IDLE_TIMEOUT));

    // A stop after the stream already ended must not turn into a discard
    engine.stop_playing();

    let log = sink_log.lock().unwrap();
    assert_eq!(log.drains, 1);
    assert_eq!(log.discards, 0);
}

#[test]
fn source_failure_keeps_cursor_for_retry() {
    let (mut engine, opener_state, _) = engine_with(1, Duration::ZERO);
    add_cues(&mut engine, &["a", "b"]);

    // First cue's file goes missing after it was added
    opener_state
        .lock()
        .unwrap()
        .failing
        .insert("/show/a.wav".into());

    assert!(matches!(
        engine.play_next(),
        Err(PlaybackError::InvalidSource(_))
    ));
    assert_eq!(engine.cursor(), Some(0));
    assert_eq!(engine.state(), EngineState::Idle);

    // The file comes back; the same cue plays on retry
    opener_state.lock().unwrap().failing.clear();
    engine.play_next().unwrap();
    assert_eq!(engine.cursor(), Some(1));
}

// ===== Settings =====

#[test]
fn settings_govern_the_next_stream_not_the_current_one() {
    let (mut engine, _, sink_log) = engine_with(3, Duration::from_millis(20));
    add_cues(&mut engine, &["a", "b"]);

    engine.play_next().unwrap();
    std::thread::sleep(Duration::from_millis(10));

    // Change the buffer size while the first stream is in flight
    engine
        .set_settings(Settings {
            project_name: String::new(),
            buffer_size_frames: 256,
        })
        .unwrap();

    assert!(wait_idle(&engine, IDLE_TIMEOUT));
    engine.play_next().unwrap();
    assert!(wait_idle(&engine, IDLE_TIMEOUT));

    let log = sink_log.lock().unwrap();
    assert_eq!(log.open_frames, vec![1024, 256]);
    // First stream kept writing 1024-frame stereo chunks throughout
    assert_eq!(&log.writes[..3], &[2048, 2048, 2048]);
    // Second stream picked up the new chunking
    assert_eq!(&log.writes[3..], &[512, 512, 512]);
}

// ===== Notifications =====

#[test]
fn set_name_reaches_every_name_observer_in_order() {
    let (mut engine, _, _) = engine_with(1, Duration::ZERO);
    let first = engine.subscribe_name();
    let second = engine.subscribe_name();

    engine.set_name("Show1");

    assert_eq!(first.try_recv().as_deref(), Some("Show1"));
    assert!(first.try_recv().is_none(), "exactly one event per change");
    assert_eq!(second.try_recv().as_deref(), Some("Show1"));
}

#[test]
fn queue_edits_emit_cue_list_changes() {
    let (mut engine, opener_state, _) = engine_with(1, Duration::ZERO);
    let sub = engine.subscribe_cue_list();

    add_cues(&mut engine, &["a", "b"]);
    assert_eq!(sub.len(), 2);

    engine.move_cue(0, 1).unwrap();
    engine.remove_cue(0).unwrap();
    assert_eq!(sub.len(), 4);

    // A failed add changes nothing, so it announces nothing
    opener_state
        .lock()
        .unwrap()
        .failing
        .insert("/show/x.wav".into());
    assert!(engine.add_cue("x", "/show/x.wav").is_err());
    assert_eq!(sub.len(), 4);
}

#[test]
fn settings_changes_carry_the_new_value() {
    let (mut engine, _, _) = engine_with(1, Duration::ZERO);
    let sub = engine.subscribe_settings();

    let new = Settings {
        project_name: "Evening".to_string(),
        buffer_size_frames: 512,
    };
    engine.set_settings(new.clone()).unwrap();

    assert_eq!(sub.try_recv(), Some(new));
}

#[test]
fn rejected_settings_emit_nothing() {
    let (mut engine, _, _) = engine_with(1, Duration::ZERO);
    let sub = engine.subscribe_settings();

    let result = engine.set_settings(Settings {
        project_name: String::new(),
        buffer_size_frames: 0,
    });
    assert!(matches!(result, Err(PlaybackError::InvalidBufferSize(0))));
    assert!(sub.try_recv().is_none());
}

// ===== Persistence =====

#[test]
fn save_then_load_reproduces_queue_and_settings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("show.audioq");

    let (mut engine, _, _) = engine_with(1, Duration::ZERO);
    add_cues(&mut engine, &["a", "b", "c"]);
    engine.set_name("Evening Show");
    engine
        .set_settings(Settings {
            project_name: "Evening Show".to_string(),
            buffer_size_frames: 2048,
        })
        .unwrap();
    engine.save_project(&path).unwrap();

    let (mut restored, _, _) = engine_with(1, Duration::ZERO);
    restored.load_project(&path).unwrap();

    assert_eq!(restored.snapshot(), engine.snapshot());
    assert_eq!(restored.settings(), engine.settings());
    assert_eq!(restored.cursor(), Some(0));
}

#[test]
fn load_emits_all_three_change_events() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("show.audioq");

    let (mut source_engine, _, _) = engine_with(1, Duration::ZERO);
    add_cues(&mut source_engine, &["a"]);
    source_engine.set_name("Loaded");
    source_engine.save_project(&path).unwrap();

    let (mut engine, _, _) = engine_with(1, Duration::ZERO);
    let names = engine.subscribe_name();
    let settings = engine.subscribe_settings();
    let cue_list = engine.subscribe_cue_list();

    engine.load_project(&path).unwrap();

    assert_eq!(names.try_recv().as_deref(), Some("Loaded"));
    assert!(settings.try_recv().is_some());
    assert!(cue_list.try_recv().is_some());
}

#[test]
fn failed_load_leaves_prior_state_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.audioq");
    std::fs::write(&path, "not a project at all").unwrap();

    let (mut engine, _, _) = engine_with(1, Duration::ZERO);
    add_cues(&mut engine, &["a", "b"]);
    engine.set_name("Keep Me");
    engine.jump_to(1).unwrap();

    let names = engine.subscribe_name();
    let snapshot_before = engine.snapshot();
    let settings_before = engine.settings().clone();

    assert!(matches!(
        engine.load_project(&path),
        Err(PlaybackError::Parse(_))
    ));

    assert_eq!(engine.snapshot(), snapshot_before);
    assert_eq!(engine.settings(), &settings_before);
    assert_eq!(engine.cursor(), Some(1));
    assert!(names.try_recv().is_none(), "no events on a failed load");
}

#[test]
fn load_halts_playback_and_rewinds() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("show.audioq");

    let (mut engine, _, _) = engine_with(200, Duration::from_millis(10));
    add_cues(&mut engine, &["a", "b"]);
    engine.save_project(&path).unwrap();

    engine.play_next().unwrap();
    std::thread::sleep(Duration::from_millis(25));
    assert_eq!(engine.state(), EngineState::Playing);

    engine.load_project(&path).unwrap();
    assert_eq!(engine.state(), EngineState::Idle);
    assert_eq!(engine.cursor(), Some(0));
}

#[test]
fn loading_an_empty_project_leaves_no_cursor() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.audioq");

    let (engine, _, _) = engine_with(1, Duration::ZERO);
    engine.save_project(&path).unwrap();

    let (mut engine, _, _) = engine_with(1, Duration::ZERO);
    engine.load_project(&path).unwrap();
    assert_eq!(engine.cursor(), None);
    assert!(matches!(engine.play_next(), Err(PlaybackError::NoMoreCues)));
}
