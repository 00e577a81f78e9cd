use super::*;
use crate::config::GesturepadConfig;
use crate::events::{EventBus, GesturepadEvent};
use crate::gesture::HandLandmarks;
use crate::input::{ActionDispatcher, KeyMap, KeyToken, RecordingEmitter};
use crate::profile::{Profile, ProfileStore};
use crate::source::{DetectorSettings, JsonLinesSource, LandmarkFrame, ScriptedSource};
use crate::telemetry::TelemetryStore;
use parking_lot::Mutex;
use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const CURLED: [bool; 5] = [false; 5];
const OPEN: [bool; 5] = [true; 5];

fn create_test_config(dir: &TempDir) -> GesturepadConfig {
    let mut config = GesturepadConfig::default();
    config.profiles.directory = dir.path().join("profiles").display().to_string();
    config.profiles.active_file = dir
        .path()
        .join("runtime/active_profile.txt")
        .display()
        .to_string();
    config.telemetry.file = dir.path().join("runtime/telemetry.json").display().to_string();
    config.gesture.smoothing = 0.0;
    config.overlay.font_path = "/nonexistent/font.ttf".to_string();
    config.system.dry_run_input = true;
    config.system.hotkeys = false;
    config.system.shutdown_timeout_seconds = 2;
    config
}

fn hand(fingers: [bool; 5], center_x: f64) -> LandmarkFrame {
    LandmarkFrame::single(HandLandmarks::synthetic(fingers, center_x))
}

struct LoopFixture {
    _dir: TempDir,
    frame_loop: FrameLoop,
    recorder: RecordingEmitter,
    event_bus: Arc<EventBus>,
    profiles: ProfileStore,
    telemetry: Arc<TelemetryStore>,
}

async fn open_profiles(dir: &TempDir) -> ProfileStore {
    ProfileStore::open(
        dir.path().join("profiles"),
        dir.path().join("runtime/active_profile.txt"),
        Profile::new("default"),
    )
    .await
    .unwrap()
}

async fn loop_fixture(
    source: Box<dyn crate::source::LandmarkSource>,
    configure: impl FnOnce(&mut GesturepadConfig),
) -> LoopFixture {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    configure(&mut config);

    let profiles = open_profiles(&dir).await;
    let mut wide = Profile::new("wide");
    wide.left_bound = 0.1;
    wide.right_bound = 0.9;
    wide.detection_confidence = 0.5;
    profiles.save(wide).await.unwrap();

    let telemetry = Arc::new(TelemetryStore::in_memory(50));
    let event_bus = Arc::new(EventBus::new(32));
    let recorder = RecordingEmitter::new();
    let keymap = KeyMap::from_config(&config.keys).unwrap();

    let frame_loop = FrameLoopBuilder::new()
        .settings(&config)
        .source(source)
        .dispatcher(ActionDispatcher::new(keymap, Box::new(recorder.clone())))
        .profiles(profiles.clone())
        .telemetry(Arc::clone(&telemetry))
        .event_bus(Arc::clone(&event_bus))
        .build()
        .await
        .unwrap();

    LoopFixture {
        _dir: dir,
        frame_loop,
        recorder,
        event_bus,
        profiles,
        telemetry,
    }
}

fn scripted(frames: Vec<LandmarkFrame>) -> (Box<ScriptedSource>, Arc<Mutex<Vec<DetectorSettings>>>) {
    let source = ScriptedSource::new(frames);
    let applied = source.applied_settings();
    (Box::new(source), applied)
}

#[tokio::test]
async fn test_frame_loop_emits_lane_change_once() {
    let (source, applied) = scripted(vec![
        hand(CURLED, 0.5),
        hand(CURLED, 0.5),
        hand(CURLED, 0.2),
        hand(CURLED, 0.2),
    ]);
    let mut fx = loop_fixture(source, |_| {}).await;

    let stats = fx.frame_loop.run(CancellationToken::new()).await.unwrap();

    assert_eq!(fx.recorder.pulses(), vec![KeyToken::Left]);
    assert_eq!(stats.frames, 4);
    assert_eq!(stats.actions, 1);
    assert_eq!(stats.source_faults, 0);
    // the active profile's thresholds are pushed before the first frame
    assert_eq!(applied.lock().len(), 1);
}

#[tokio::test]
async fn test_frame_loop_held_jump_fires_once() {
    let (source, _) = scripted(vec![hand(OPEN, 0.5), hand(OPEN, 0.5), hand(OPEN, 0.5)]);
    let mut fx = loop_fixture(source, |_| {}).await;
    let mut events = fx.event_bus.subscribe();

    fx.frame_loop.run(CancellationToken::new()).await.unwrap();

    assert_eq!(fx.recorder.pulses(), vec![KeyToken::Up]);

    let mut emitted = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let GesturepadEvent::ActionEmitted { action, profile, .. } = event {
            emitted.push((action, profile));
        }
    }
    assert_eq!(emitted, vec![(crate::gesture::Action::Jump, "default".to_string())]);
}

#[tokio::test]
async fn test_frame_loop_records_telemetry() {
    let (source, _) = scripted(vec![hand(CURLED, 0.8), hand(CURLED, 0.8)]);
    let mut fx = loop_fixture(source, |_| {}).await;

    fx.frame_loop.run(CancellationToken::new()).await.unwrap();

    // the second frame falls inside the publish interval
    assert_eq!(fx.telemetry.len(), 1);
    let latest = fx.telemetry.latest().unwrap();
    assert_eq!(latest.profile, "default");
    assert!(latest.has_hand);
    assert_eq!(latest.center_x, 0.8);

    let frame = fx.telemetry.latest_frame().unwrap();
    assert!(frame.hand.is_some());
    assert_eq!(frame.bounds.left(), 0.35);
}

#[tokio::test]
async fn test_profile_activation_rebuilds_controller() {
    let (source, applied) = scripted(vec![
        hand(CURLED, 0.2),
        hand(CURLED, 0.5),
        hand(CURLED, 0.2),
    ]);
    let mut fx = loop_fixture(source, |_| {}).await;

    fx.event_bus
        .publish(GesturepadEvent::ProfileActivated {
            name: "wide".to_string(),
        })
        .await
        .unwrap();

    fx.frame_loop.run(CancellationToken::new()).await.unwrap();

    // LEFT under default bounds, then 0.2 sits in the wide profile's center lane
    assert_eq!(fx.recorder.pulses(), vec![KeyToken::Left]);
    assert_eq!(fx.frame_loop.profile_name(), "wide");

    let applied = applied.lock();
    assert_eq!(applied.len(), 2);
    assert_eq!(applied[1].detection_confidence, 0.5);
}

#[tokio::test]
async fn test_unknown_profile_activation_is_ignored() {
    let (source, _) = scripted(vec![hand(CURLED, 0.5), hand(CURLED, 0.5)]);
    let mut fx = loop_fixture(source, |_| {}).await;

    fx.event_bus
        .publish(GesturepadEvent::ProfileActivated {
            name: "ghost".to_string(),
        })
        .await
        .unwrap();

    fx.frame_loop.run(CancellationToken::new()).await.unwrap();
    assert_eq!(fx.frame_loop.profile_name(), "default");
}

#[tokio::test]
async fn test_profile_cycle_request() {
    let (source, _) = scripted(vec![hand(CURLED, 0.5), hand(CURLED, 0.5)]);
    let mut fx = loop_fixture(source, |_| {}).await;

    fx.event_bus
        .publish(GesturepadEvent::ProfileCycleRequested {
            timestamp: SystemTime::now(),
        })
        .await
        .unwrap();

    fx.frame_loop.run(CancellationToken::new()).await.unwrap();

    // listing order is default, wide
    assert_eq!(fx.frame_loop.profile_name(), "wide");
    assert_eq!(fx.profiles.active_name().await, "wide");
}

#[tokio::test]
async fn test_help_toggle() {
    let (source, _) = scripted(vec![hand(CURLED, 0.5), hand(CURLED, 0.5)]);
    let mut fx = loop_fixture(source, |_| {}).await;
    assert!(fx.frame_loop.show_help());

    fx.event_bus
        .publish(GesturepadEvent::OverlayHelpToggled {
            timestamp: SystemTime::now(),
        })
        .await
        .unwrap();

    fx.frame_loop.run(CancellationToken::new()).await.unwrap();

    assert!(!fx.frame_loop.show_help());
    assert!(!fx.telemetry.latest_frame().unwrap().show_help);
}

#[tokio::test]
async fn test_source_faults_become_empty_frames() {
    let input = "garbage\n{\"hands\": [[{\"x\": 0.5}]]}\nnot json either\n{\"hands\": []}\n";
    let source = JsonLinesSource::from_reader(Cursor::new(input.as_bytes().to_vec()), "test");
    let mut fx = loop_fixture(Box::new(source), |_| {}).await;

    let stats = fx.frame_loop.run(CancellationToken::new()).await.unwrap();

    assert_eq!(stats.frames, 4);
    assert_eq!(stats.source_faults, 3);
    assert!(fx.recorder.pulses().is_empty());
}

#[tokio::test]
async fn test_too_many_source_faults_stop_the_loop() {
    let input = "bad\nbad\nbad\n{\"hands\": []}\n";
    let source = JsonLinesSource::from_reader(Cursor::new(input.as_bytes().to_vec()), "test");
    let mut fx = loop_fixture(Box::new(source), |config| {
        config.source.max_consecutive_failures = 2;
    })
    .await;

    let result = fx.frame_loop.run(CancellationToken::new()).await;
    assert!(result.is_err());
    assert_eq!(fx.frame_loop.stats().source_faults, 3);
}

#[tokio::test]
async fn test_frame_loop_cancellation() {
    let source = ScriptedSource::new(vec![hand(CURLED, 0.5)])
        .repeating()
        .with_frame_interval(Duration::from_millis(10));
    let mut fx = loop_fixture(Box::new(source), |_| {}).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let stats = tokio::time::timeout(Duration::from_secs(2), fx.frame_loop.run(cancel))
        .await
        .unwrap()
        .unwrap();
    assert!(stats.frames > 0);
}

#[tokio::test]
async fn test_orchestrator_creation() {
    let dir = TempDir::new().unwrap();
    let orchestrator = GesturepadOrchestrator::new(create_test_config(&dir), RunMode::Controller)
        .await
        .unwrap();

    let states = orchestrator.get_all_component_states().await;
    assert!(states.is_empty());

    let profile = orchestrator.profiles().active().await.unwrap();
    assert_eq!(profile.name, "default");
    assert_eq!(profile.description, "Balanced profile for most players.");
}

#[tokio::test]
async fn test_component_state_management() {
    let dir = TempDir::new().unwrap();
    let orchestrator = GesturepadOrchestrator::new(create_test_config(&dir), RunMode::All)
        .await
        .unwrap();

    orchestrator
        .set_component_state("frame_loop", ComponentState::Starting)
        .await;
    assert_eq!(
        orchestrator.get_component_state("frame_loop").await,
        Some(ComponentState::Starting)
    );

    orchestrator
        .set_component_state("frame_loop", ComponentState::Running)
        .await;
    orchestrator
        .set_component_state("api", ComponentState::Failed)
        .await;

    let all_states = orchestrator.get_all_component_states().await;
    assert_eq!(all_states.len(), 2);
    assert_eq!(all_states.get("frame_loop"), Some(&ComponentState::Running));
    assert_eq!(all_states.get("api"), Some(&ComponentState::Failed));
}

#[tokio::test]
async fn test_initialize_registers_mode_components() {
    let dir = TempDir::new().unwrap();
    let mut orchestrator =
        GesturepadOrchestrator::new(create_test_config(&dir), RunMode::Controller)
            .await
            .unwrap();
    orchestrator.set_source(Box::new(ScriptedSource::new(Vec::new())));
    orchestrator.initialize().await.unwrap();

    let states = orchestrator.get_all_component_states().await;
    assert_eq!(states.len(), 1);
    assert_eq!(states.get("frame_loop"), Some(&ComponentState::Stopped));
}

#[tokio::test]
async fn test_initial_profile_must_exist() {
    let dir = TempDir::new().unwrap();
    let mut orchestrator =
        GesturepadOrchestrator::new(create_test_config(&dir), RunMode::Controller)
            .await
            .unwrap();
    orchestrator.set_source(Box::new(ScriptedSource::new(Vec::new())));
    orchestrator.set_initial_profile(Some("missing".to_string()));

    assert!(orchestrator.initialize().await.is_err());
}

#[tokio::test]
async fn test_controller_run_until_stream_ends() {
    let dir = TempDir::new().unwrap();
    let mut orchestrator =
        GesturepadOrchestrator::new(create_test_config(&dir), RunMode::Controller)
            .await
            .unwrap();

    let mut frames = vec![hand(CURLED, 0.5), hand(CURLED, 0.2)];
    frames.extend(std::iter::repeat(hand(OPEN, 0.2)).take(5));
    let source = ScriptedSource::new(frames).with_frame_interval(Duration::from_millis(100));
    let recorder = RecordingEmitter::new();
    orchestrator.set_source(Box::new(source));
    orchestrator.set_emitter(Box::new(recorder.clone()));

    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();
    let exit_code = tokio::time::timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(exit_code, 0);
    assert_eq!(recorder.pulses(), vec![KeyToken::Left, KeyToken::Up]);
    assert_eq!(
        orchestrator.get_component_state("frame_loop").await,
        Some(ComponentState::Stopped)
    );
    assert!(orchestrator.telemetry().latest().is_some());
    assert!(dir.path().join("runtime/telemetry.json").exists());
}

#[tokio::test]
async fn test_shutdown_request_over_event_bus() {
    let dir = TempDir::new().unwrap();
    let mut orchestrator =
        GesturepadOrchestrator::new(create_test_config(&dir), RunMode::Controller)
            .await
            .unwrap();
    let source = ScriptedSource::demo().with_frame_interval(Duration::from_millis(10));
    orchestrator.set_source(Box::new(source));
    orchestrator.set_emitter(Box::new(RecordingEmitter::new()));

    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    let event_bus = orchestrator.event_bus();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = event_bus
            .publish(GesturepadEvent::ShutdownRequested {
                timestamp: SystemTime::now(),
                reason: "test".to_string(),
            })
            .await;
    });

    let exit_code = tokio::time::timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit_code, 0);
}

#[tokio::test]
async fn test_failed_frame_loop_sets_exit_code() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.source.max_consecutive_failures = 0;
    let mut orchestrator = GesturepadOrchestrator::new(config, RunMode::Controller)
        .await
        .unwrap();

    let source = JsonLinesSource::from_reader(Cursor::new(b"broken\n".to_vec()), "test");
    orchestrator.set_source(Box::new(source));
    orchestrator.set_emitter(Box::new(RecordingEmitter::new()));

    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();
    let exit_code = tokio::time::timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(exit_code, 1);
    assert_eq!(
        orchestrator.get_component_state("frame_loop").await,
        Some(ComponentState::Failed)
    );
}

#[test]
fn test_run_mode_components() {
    assert!(RunMode::Controller.runs_controller());
    assert!(!RunMode::Controller.runs_api());
    assert!(RunMode::Api.runs_api());
    assert!(!RunMode::Api.runs_controller());
    assert!(RunMode::All.runs_controller() && RunMode::All.runs_api());
    assert_eq!(RunMode::All.to_string(), "all");
}
