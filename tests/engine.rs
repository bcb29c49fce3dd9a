// Integration tests for the sound-effect engine
// Everything runs on the headless backend; clips end when the test says so.

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver};
use serde_json::json;

use sfx_voices::audio_system::{ManualBackend, ManualStatus, VoiceSlot, VoiceState};
use sfx_voices::messaging::{CommandExecutor, CommandResult, CompletionEvent, Responder};
use sfx_voices::{Engine, EngineError, ErrorKind};

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(150);

fn wav_spec() -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// 20ms of a rising ramp as WAV bytes
fn wav_bytes() -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, wav_spec()).unwrap();
        for i in 0..160 {
            writer.write_sample((i * 100) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn write_wav(path: &Path) {
    let mut writer = hound::WavWriter::create(path, wav_spec()).unwrap();
    for i in 0..160 {
        writer.write_sample((i * 100) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn setup() -> (Engine, ManualBackend) {
    let backend = ManualBackend::new();
    (Engine::new(Arc::new(backend.clone())), backend)
}

fn load(engine: &Engine, id: &str, voices: usize) {
    engine
        .preload_from_memory(id, id, wav_bytes(), Some(1.0), Some(voices))
        .unwrap();
}

fn completions(engine: &Engine, id: &str) -> Receiver<CompletionEvent> {
    let (tx, rx) = unbounded();
    engine.add_completion_listener(id, move |event| {
        let _ = tx.send(event.clone());
    });
    rx
}

#[test]
fn test_duplicate_preload_keeps_original() {
    let (engine, backend) = setup();
    engine
        .preload_from_memory("a", "first", wav_bytes(), Some(0.4), Some(1))
        .unwrap();

    let err = engine
        .preload_from_memory("a", "second", wav_bytes(), None, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateId);

    assert_eq!(engine.asset_count(), 1);
    assert_eq!(backend.opened("second"), 0);

    engine.play("a").unwrap();
    assert_eq!(backend.starts("first").len(), 1);
    assert_eq!(backend.starts("first")[0].volume, 0.4);
}

#[test]
fn test_unknown_ids_are_not_found() {
    let (engine, _) = setup();
    load(&engine, "known", 1);

    let results = [
        engine.play("ghost"),
        engine.loop_asset("ghost"),
        engine.stop("ghost"),
        engine.unload("ghost"),
        engine.set_volume("ghost", 0.5),
        engine.resume(Some("ghost")),
        engine.pause(Some("ghost")).map(|_| ()),
    ];
    for result in results {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
    }

    assert_eq!(engine.asset_count(), 1);
    assert_eq!(engine.asset_state("known").unwrap(), VoiceState::Idle);
    assert!(engine.resume_queue().is_empty());
}

#[test]
fn test_unload_frees_id_and_voices() {
    let (engine, backend) = setup();
    load(&engine, "a", 3);
    engine.play("a").unwrap();
    engine.loop_asset("a").unwrap();
    assert_eq!(backend.live_voices("a"), 4);

    engine.unload("a").unwrap();
    assert_eq!(backend.live_voices("a"), 0);
    assert!(!engine.contains("a"));
    assert_eq!(engine.play("a").unwrap_err().kind(), ErrorKind::NotFound);

    load(&engine, "a", 1);
    engine.play("a").unwrap();
    assert_eq!(engine.asset_state("a").unwrap(), VoiceState::Playing);
}

#[test]
fn test_pause_and_resume_single_asset() {
    let (engine, backend) = setup();
    load(&engine, "a", 1);

    engine.play("a").unwrap();
    assert!(engine.pause(Some("a")).unwrap());
    assert_eq!(engine.asset_state("a").unwrap(), VoiceState::Paused);
    assert_eq!(backend.status("a", VoiceSlot::Pool(0)), Some(ManualStatus::Paused));

    engine.resume(Some("a")).unwrap();
    assert_eq!(engine.asset_state("a").unwrap(), VoiceState::Playing);
    assert_eq!(backend.status("a", VoiceSlot::Pool(0)), Some(ManualStatus::Playing));
}

#[test]
fn test_pause_after_natural_end_is_noop() {
    let (engine, backend) = setup();
    load(&engine, "a", 1);

    engine.play("a").unwrap();
    assert!(backend.finish("a", VoiceSlot::Pool(0)));
    assert_eq!(engine.asset_state("a").unwrap(), VoiceState::Idle);

    assert!(!engine.pause(Some("a")).unwrap());
    assert!(engine.resume_queue().is_empty());

    // Resuming an idle asset does not restart it
    engine.resume(Some("a")).unwrap();
    assert_eq!(engine.asset_state("a").unwrap(), VoiceState::Idle);
}

#[test]
fn test_blanket_pause_resumes_in_order() {
    let (engine, _) = setup();
    for id in ["a", "b", "c"] {
        load(&engine, id, 1);
        engine.play(id).unwrap();
    }

    assert!(engine.pause(None).unwrap());
    assert_eq!(engine.resume_queue(), vec!["a", "b", "c"]);
    for id in ["a", "b", "c"] {
        assert_eq!(engine.asset_state(id).unwrap(), VoiceState::Paused);
    }

    engine.resume(None).unwrap();
    assert!(engine.resume_queue().is_empty());
    for id in ["a", "b", "c"] {
        assert_eq!(engine.asset_state(id).unwrap(), VoiceState::Playing);
    }

    assert_eq!(engine.resume(None).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn test_blanket_pause_skips_idle_assets() {
    let (engine, _) = setup();
    for id in ["a", "b", "c"] {
        load(&engine, id, 1);
    }
    engine.play("b").unwrap();

    assert!(engine.pause(None).unwrap());
    assert_eq!(engine.resume_queue(), vec!["b"]);

    // Nothing left playing; the queue is unchanged
    assert!(!engine.pause(None).unwrap());
    assert_eq!(engine.resume_queue(), vec!["b"]);
}

#[test]
fn test_round_robin_retriggers_oldest_voice() {
    let (engine, backend) = setup();
    load(&engine, "shot", 2);

    for _ in 0..3 {
        engine.play("shot").unwrap();
    }

    let slots: Vec<VoiceSlot> = backend.starts("shot").iter().map(|s| s.slot).collect();
    assert_eq!(
        slots,
        vec![VoiceSlot::Pool(0), VoiceSlot::Pool(1), VoiceSlot::Pool(0)]
    );
    assert_eq!(backend.status("shot", VoiceSlot::Pool(1)), Some(ManualStatus::Playing));
}

#[test]
fn test_completion_reported_once() {
    let (engine, backend) = setup();
    let rx = completions(&engine, "a");
    load(&engine, "a", 1);

    engine.play("a").unwrap();
    assert!(backend.finish("a", VoiceSlot::Pool(0)));
    assert!(!backend.finish("a", VoiceSlot::Pool(0)));

    assert_eq!(rx.recv_timeout(WAIT).unwrap(), CompletionEvent::new("a"));
    assert!(rx.recv_timeout(QUIET).is_err());
}

#[test]
fn test_stop_and_retrigger_suppress_completion() {
    let (engine, backend) = setup();
    let rx = completions(&engine, "a");
    load(&engine, "a", 1);

    engine.play("a").unwrap();
    engine.stop("a").unwrap();
    assert!(!backend.finish("a", VoiceSlot::Pool(0)));

    // Retrigger replaces the pending completion with a fresh one
    engine.play("a").unwrap();
    engine.play("a").unwrap();
    assert!(backend.finish("a", VoiceSlot::Pool(0)));

    assert_eq!(rx.recv_timeout(WAIT).unwrap().id, "a");
    assert!(rx.recv_timeout(QUIET).is_err());
}

#[test]
fn test_loop_uses_one_dedicated_voice() {
    let (engine, backend) = setup();
    let rx = completions(&engine, "music");
    load(&engine, "music", 2);

    engine.loop_asset("music").unwrap();
    engine.loop_asset("music").unwrap();

    let starts = backend.starts("music");
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].slot, VoiceSlot::Loop);
    assert!(starts[0].looping);

    // Pool voices stay free for one-shots
    engine.play("music").unwrap();
    assert_eq!(backend.starts("music")[1].slot, VoiceSlot::Pool(0));

    assert!(!backend.finish("music", VoiceSlot::Loop));
    assert!(rx.recv_timeout(QUIET).is_err());

    engine.stop("music").unwrap();
    assert_eq!(engine.asset_state("music").unwrap(), VoiceState::Idle);
    engine.loop_asset("music").unwrap();
    assert_eq!(backend.opened("music"), 3);
}

#[test]
fn test_set_volume_clamps() {
    let (engine, backend) = setup();
    engine
        .preload_from_memory("a", "a", wav_bytes(), Some(0.3), Some(2))
        .unwrap();

    engine.set_volume("a", 2.0).unwrap();
    assert_eq!(backend.volume("a", VoiceSlot::Pool(0)), Some(1.0));
    assert_eq!(backend.volume("a", VoiceSlot::Pool(1)), Some(1.0));

    engine.set_volume("a", -1.0).unwrap();
    engine.play("a").unwrap();
    assert_eq!(backend.starts("a")[0].volume, 0.0);
}

#[test]
fn test_preload_file_locator() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("click.wav");
    write_wav(&path);

    let (engine, backend) = setup();
    let locator = format!("file://{}", path.display());
    engine.preload("click", &locator, None, None).unwrap();

    let source = path.display().to_string();
    assert_eq!(backend.opened(&source), 1);
    engine.play("click").unwrap();
    assert_eq!(backend.starts(&source)[0].volume, 1.0);
}

#[test]
fn test_preload_decode_errors() {
    let dir = tempfile::tempdir().unwrap();
    let garbage = dir.path().join("noise.wav");
    std::fs::write(&garbage, b"definitely not audio").unwrap();

    let (engine, _) = setup();
    let err = engine
        .preload("noise", garbage.to_str().unwrap(), None, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecodeError);

    let missing = dir.path().join("missing.wav");
    let err = engine
        .preload("missing", missing.to_str().unwrap(), None, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecodeError);

    assert_eq!(engine.asset_count(), 0);
}

#[test]
fn test_executor_command_flow() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shot.wav");
    write_wav(&path);
    let source = path.display().to_string();

    let backend = ManualBackend::new();
    let engine = Arc::new(Engine::new(Arc::new(backend.clone())));
    let executor = CommandExecutor::with_workers(Arc::clone(&engine), 2);

    let call = |action: &str, args: serde_json::Value| {
        let (responder, rx) = Responder::channel();
        executor.submit(action, &args, responder);
        rx.recv_timeout(WAIT).unwrap()
    };

    let locator = format!("file://{}", source);
    assert!(call("preloadComplex", json!(["shot", locator, 0.5, 2])).is_ok());
    assert_eq!(
        call("preloadSimple", json!(["shot", locator])).error_kind(),
        Some("DuplicateId")
    );

    let (listener, events) = Responder::channel();
    executor.submit("addCompleteListener", &json!(["shot"]), listener);

    assert!(call("play", json!(["shot"])).is_ok());
    assert!(backend.finish(&source, VoiceSlot::Pool(0)));
    assert_eq!(
        events.recv_timeout(WAIT).unwrap(),
        CommandResult::with_value(json!({ "id": "shot" }))
    );

    assert!(call("play", json!(["shot"])).is_ok());
    assert!(call("pause", json!([])).is_ok());
    assert_eq!(engine.resume_queue(), vec!["shot"]);
    assert!(call("resume", json!([""])).is_ok());
    assert_eq!(engine.asset_state("shot").unwrap(), VoiceState::Playing);

    assert!(call("setVolumeForComplexAsset", json!(["shot", 0.25])).is_ok());
    assert_eq!(backend.volume(&source, VoiceSlot::Pool(1)), Some(0.25));

    assert!(call("unload", json!(["shot"])).is_ok());
    assert_eq!(call("stop", json!(["shot"])).error_kind(), Some("NotFound"));
    assert!(events.recv_timeout(QUIET).is_err());
}

#[test]
fn test_listener_can_reenter_engine() {
    let (engine, backend) = setup();
    let engine = Arc::new(engine);
    load(&engine, "a", 1);

    let (tx, rx) = unbounded();
    let weak = Arc::downgrade(&engine);
    engine.add_completion_listener("a", move |event| {
        if let Some(engine) = weak.upgrade() {
            // Runs on the dispatcher thread while playback threads keep going
            let state = engine.asset_state(&event.id);
            let replay = engine.play(&event.id);
            let _ = tx.send((state.ok(), replay.is_ok()));
        }
    });

    engine.play("a").unwrap();
    assert!(backend.finish("a", VoiceSlot::Pool(0)));

    let (state, replayed) = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(state, Some(VoiceState::Idle));
    assert!(replayed);
    assert_eq!(backend.starts("a").len(), 2);
}

#[test]
fn test_concurrent_operations_finish() {
    const THREADS: usize = 8;
    const OPS: usize = 300;
    const IDS: [&str; 5] = ["a", "b", "c", "d", "e"];

    let backend = ManualBackend::new();
    let engine = Arc::new(Engine::new(Arc::new(backend.clone())));
    let completions = Arc::new(AtomicUsize::new(0));

    for id in IDS {
        let weak = Arc::downgrade(&engine);
        let completions = Arc::clone(&completions);
        engine.add_completion_listener(id, move |event| {
            completions.fetch_add(1, Ordering::SeqCst);
            if let Some(engine) = weak.upgrade() {
                let _ = engine.set_volume(&event.id, 0.5);
                let _ = engine.pause(Some(&event.id));
            }
        });
    }

    let (done_tx, done_rx) = unbounded();
    for t in 0..THREADS {
        let engine = Arc::clone(&engine);
        let backend = backend.clone();
        let done_tx = done_tx.clone();
        thread::spawn(move || {
            for i in 0..OPS {
                let id = IDS[(t * 7 + i * 3) % IDS.len()];
                let result = match (t + i * 5) % 9 {
                    0 | 1 => engine.preload_from_memory(id, id, wav_bytes(), None, Some(2)),
                    2 | 3 => engine.play(id),
                    4 => engine.pause(None).map(|_| ()),
                    5 => engine.resume(None),
                    6 => engine.unload(id),
                    7 => engine.loop_asset(id),
                    _ => {
                        backend.finish(id, VoiceSlot::Pool(i % 2));
                        Ok(())
                    }
                };
                if let Err(e) = result {
                    assert!(
                        matches!(e, EngineError::NotFound(_) | EngineError::DuplicateId(_)),
                        "unexpected error: {}",
                        e
                    );
                }
            }
            let _ = done_tx.send(t);
        });
    }
    drop(done_tx);

    for _ in 0..THREADS {
        done_rx
            .recv_timeout(Duration::from_secs(20))
            .expect("engine operations did not finish");
    }

    for id in engine.resume_queue() {
        assert!(engine.contains(&id), "{} queued but not registered", id);
    }
    assert!(engine.asset_count() <= IDS.len());
}
