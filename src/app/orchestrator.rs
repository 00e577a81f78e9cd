use super::runner::{FrameLoop, FrameLoopStats};
use super::types::{ComponentState, RunMode, ShutdownReason};
use crate::config::GesturepadConfig;
use crate::error::Result;
use crate::events::{EventBus, EventFilter, EventReceiver};
use crate::input::InputEmitter;
use crate::keyboard_input::HotkeyListener;
use crate::profile::{Profile, ProfileStore, DEFAULT_PROFILE_NAME};
use crate::source::LandmarkSource;
use crate::telemetry::TelemetryStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Wires the stores, event bus, frame loop, API server and hotkeys together
pub struct GesturepadOrchestrator {
    pub(super) config: Arc<GesturepadConfig>,
    pub(super) mode: RunMode,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) profiles: ProfileStore,
    pub(super) telemetry: Arc<TelemetryStore>,

    // Components
    pub(super) initial_profile: Option<String>,
    pub(super) source_override: Option<Box<dyn LandmarkSource>>,
    pub(super) emitter_override: Option<Box<dyn InputEmitter>>,
    pub(super) frame_loop: Option<FrameLoop>,
    pub(super) frame_loop_task: Option<JoinHandle<Result<FrameLoopStats>>>,
    pub(super) api_task: Option<JoinHandle<Result<()>>>,
    pub(super) hotkeys: Option<HotkeyListener>,
    pub(super) hotkeys_enabled: bool,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_requests: Option<EventReceiver>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl GesturepadOrchestrator {
    /// Open the profile and telemetry stores. Nothing runs until `start`.
    pub async fn new(config: GesturepadConfig, mode: RunMode) -> Result<Self> {
        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));

        let mut default_profile = Profile::new(DEFAULT_PROFILE_NAME);
        default_profile.description = "Balanced profile for most players.".to_string();
        let profiles = ProfileStore::open(
            &config.profiles.directory,
            &config.profiles.active_file,
            default_profile,
        )
        .await?;

        let telemetry = if config.telemetry.persist {
            TelemetryStore::open(&config.telemetry.file, config.telemetry.max_history).await?
        } else {
            TelemetryStore::in_memory(config.telemetry.max_history)
        };

        // subscribe before anything can publish a shutdown request
        let shutdown_requests = event_bus.subscribe_filtered(
            EventFilter::EventTypes(vec!["shutdown_requested"]),
            "orchestrator",
        );
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        info!("Gesturepad orchestrator created in '{}' mode", mode);

        Ok(Self {
            hotkeys_enabled: config.system.hotkeys,
            config: Arc::new(config),
            mode,
            event_bus,
            profiles,
            telemetry: Arc::new(telemetry),
            initial_profile: None,
            source_override: None,
            emitter_override: None,
            frame_loop: None,
            frame_loop_task: None,
            api_task: None,
            hotkeys: None,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_requests: Some(shutdown_requests),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        })
    }

    pub fn set_hotkeys_enabled(&mut self, enabled: bool) {
        self.hotkeys_enabled = enabled;
    }

    /// Activate this profile during `initialize`
    pub fn set_initial_profile(&mut self, name: Option<String>) {
        self.initial_profile = name;
    }

    /// Use this source instead of the configured one
    pub fn set_source(&mut self, source: Box<dyn LandmarkSource>) {
        self.source_override = Some(source);
    }

    /// Use this emitter instead of uinput or the dry-run logger
    pub fn set_emitter(&mut self, emitter: Box<dyn InputEmitter>) {
        self.emitter_override = Some(emitter);
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn telemetry(&self) -> Arc<TelemetryStore> {
        Arc::clone(&self.telemetry)
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }
}
