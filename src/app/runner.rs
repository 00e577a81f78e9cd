use crate::config::GesturepadConfig;
use crate::error::{EventBusError, GesturepadError, Result};
use crate::events::{EventBus, EventFilter, EventReceiver, GesturepadEvent};
use crate::gesture::{Action, GestureController, HandLandmarks, DEFAULT_SMOOTHING};
use crate::input::ActionDispatcher;
use crate::profile::ProfileStore;
use crate::source::{DetectorSettings, LandmarkSource};
use crate::telemetry::{FpsMeter, LiveFrame, TelemetrySnapshot, TelemetryStore};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Counters reported when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameLoopStats {
    pub frames: u64,
    pub actions: u64,
    pub source_faults: u64,
}

/// Reads landmark frames, turns them into key pulses and feeds telemetry.
/// Requests from other tasks are applied between frames.
pub struct FrameLoop {
    source: Box<dyn LandmarkSource>,
    controller: GestureController,
    dispatcher: ActionDispatcher,
    fps: FpsMeter,
    profiles: ProfileStore,
    telemetry: Arc<TelemetryStore>,
    event_bus: Arc<EventBus>,
    requests: EventReceiver,
    smoothing: f64,
    publish_interval: Duration,
    last_publish: Option<Instant>,
    max_consecutive_failures: u32,
    consecutive_failures: u32,
    show_help: bool,
    stats: FrameLoopStats,
}

impl FrameLoop {
    pub fn profile_name(&self) -> &str {
        self.controller.profile_name()
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn stats(&self) -> FrameLoopStats {
        self.stats
    }

    /// Process frames until the source ends or `cancel` fires. Fails only
    /// when the source keeps faulting past the configured limit.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<FrameLoopStats> {
        let description = self.source.describe();
        info!(
            "Frame loop started on {} with profile '{}'",
            description,
            self.profile_name()
        );
        notify(&self.event_bus, GesturepadEvent::SourceStatusChanged {
            connected: true,
            description: description.clone(),
            timestamp: SystemTime::now(),
        })
        .await;

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Frame loop cancelled");
                    break;
                }
                next = self.source.next_frame() => next,
            };

            let hands = match next {
                Ok(Some(frame)) => {
                    self.consecutive_failures = 0;
                    trace!("Frame with {} hand(s)", frame.hands.len());
                    frame.hands
                }
                Ok(None) => {
                    info!("Landmark stream from {} ended", description);
                    break;
                }
                Err(e) => {
                    self.consecutive_failures += 1;
                    self.stats.source_faults += 1;
                    warn!(
                        "Landmark source fault ({} in a row): {}",
                        self.consecutive_failures, e
                    );

                    if self.consecutive_failures > self.max_consecutive_failures {
                        let message = format!(
                            "{} consecutive source faults, last: {}",
                            self.consecutive_failures, e
                        );
                        error!("Stopping frame loop: {}", message);
                        notify(&self.event_bus, GesturepadEvent::SystemError {
                            component: "frame_loop".to_string(),
                            error: message.clone(),
                        })
                        .await;
                        return Err(GesturepadError::component("frame_loop", message));
                    }
                    Vec::new()
                }
            };

            self.step(&hands, Instant::now()).await;
            self.apply_requests().await;
        }

        notify(&self.event_bus, GesturepadEvent::SourceStatusChanged {
            connected: false,
            description,
            timestamp: SystemTime::now(),
        })
        .await;

        info!(
            "Frame loop finished: {} frames, {} actions, {} source faults",
            self.stats.frames, self.stats.actions, self.stats.source_faults
        );
        Ok(self.stats)
    }

    async fn step(&mut self, hands: &[HandLandmarks], now: Instant) {
        let fps = self.fps.tick(now);
        let decision = self.controller.process(hands, now);
        self.stats.frames += 1;

        if let Some(action) = decision.fire {
            self.emit(action).await;
        }

        self.telemetry.record_frame(LiveFrame {
            snapshot: decision.snapshot,
            hand: hands.first().cloned(),
            fps,
            profile: self.controller.profile_name().to_string(),
            bounds: self.controller.bounds(),
            show_help: self.show_help,
        });

        let due = self
            .last_publish
            .map_or(true, |last| now.duration_since(last) >= self.publish_interval);
        if due {
            self.last_publish = Some(now);
            let snapshot =
                TelemetrySnapshot::new(&decision.snapshot, fps, self.controller.profile_name());
            if let Err(e) = self.telemetry.publish(snapshot).await {
                warn!("Failed to publish telemetry: {}", e);
            }
        }
    }

    async fn emit(&mut self, action: Action) {
        match self.dispatcher.dispatch(action) {
            Ok(Some(_)) => {
                self.stats.actions += 1;
                notify(&self.event_bus, GesturepadEvent::ActionEmitted {
                    action,
                    profile: self.controller.profile_name().to_string(),
                    timestamp: SystemTime::now(),
                })
                .await;
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Failed to emit {}: {}", action, e);
                notify(&self.event_bus, GesturepadEvent::SystemError {
                    component: "input".to_string(),
                    error: e.to_string(),
                })
                .await;
            }
        }
    }

    /// Drain queued profile and overlay requests
    async fn apply_requests(&mut self) {
        loop {
            let event = match self.requests.try_recv() {
                Ok(Some(event)) => event,
                Ok(None) | Err(EventBusError::ChannelClosed) => break,
                Err(e) => {
                    warn!("Missed frame loop requests: {}", e);
                    continue;
                }
            };

            match event {
                GesturepadEvent::ProfileActivated { name } => self.switch_profile(&name).await,
                GesturepadEvent::ProfileCycleRequested { .. } => self.cycle_profile().await,
                GesturepadEvent::OverlayHelpToggled { .. } => {
                    self.show_help = !self.show_help;
                    info!(
                        "Overlay help {}",
                        if self.show_help { "shown" } else { "hidden" }
                    );
                }
                other => debug!("Ignoring {}", other.event_type()),
            }
        }
    }

    async fn switch_profile(&mut self, name: &str) {
        let profile = match self.profiles.get(name).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Cannot switch to profile '{}': {}", name, e);
                return;
            }
        };

        match GestureController::from_profile(&profile, self.smoothing) {
            Ok(controller) => self.controller = controller,
            Err(e) => {
                warn!("Profile '{}' is not usable: {}", name, e);
                return;
            }
        }

        if let Err(e) = self
            .source
            .apply_detector_settings(DetectorSettings::from(&profile))
            .await
        {
            warn!("Failed to push detector settings for '{}': {}", name, e);
        }

        info!("Frame loop now using profile '{}'", profile.name);
    }

    async fn cycle_profile(&mut self) {
        let current = self.controller.profile_name().to_string();
        let next = match self.profiles.next_after(&current).await {
            Ok(Some(next)) => next,
            Ok(None) => return,
            Err(e) => {
                warn!("Failed to list profiles: {}", e);
                return;
            }
        };

        if let Err(e) = self.profiles.activate(&next.name).await {
            warn!("Failed to activate profile '{}': {}", next.name, e);
            return;
        }

        // picked up by our own receiver on the next drain
        if self
            .event_bus
            .publish(GesturepadEvent::ProfileActivated {
                name: next.name.clone(),
            })
            .await
            .is_err()
        {
            self.switch_profile(&next.name).await;
        }
    }
}

async fn notify(event_bus: &EventBus, event: GesturepadEvent) {
    if let Err(e) = event_bus.publish(event).await {
        trace!("Event not delivered: {}", e);
    }
}

pub struct FrameLoopBuilder {
    source: Option<Box<dyn LandmarkSource>>,
    dispatcher: Option<ActionDispatcher>,
    profiles: Option<ProfileStore>,
    telemetry: Option<Arc<TelemetryStore>>,
    event_bus: Option<Arc<EventBus>>,
    smoothing: f64,
    publish_interval: Duration,
    max_consecutive_failures: u32,
    show_help: bool,
}

impl FrameLoopBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            dispatcher: None,
            profiles: None,
            telemetry: None,
            event_bus: None,
            smoothing: DEFAULT_SMOOTHING,
            publish_interval: Duration::from_millis(300),
            max_consecutive_failures: 30,
            show_help: true,
        }
    }

    /// Take the tuning values from the loaded configuration
    pub fn settings(mut self, config: &GesturepadConfig) -> Self {
        self.smoothing = config.gesture.smoothing;
        self.publish_interval = Duration::from_millis(config.telemetry.publish_interval_ms);
        self.max_consecutive_failures = config.source.max_consecutive_failures;
        self.show_help = config.overlay.show_help;
        self
    }

    pub fn source(mut self, source: Box<dyn LandmarkSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn dispatcher(mut self, dispatcher: ActionDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn profiles(mut self, profiles: ProfileStore) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn telemetry(mut self, telemetry: Arc<TelemetryStore>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Load the active profile and push its detector settings to the source
    pub async fn build(self) -> Result<FrameLoop> {
        let mut source = self.source.ok_or_else(|| missing("Landmark source"))?;
        let dispatcher = self.dispatcher.ok_or_else(|| missing("Action dispatcher"))?;
        let profiles = self.profiles.ok_or_else(|| missing("Profile store"))?;
        let telemetry = self.telemetry.ok_or_else(|| missing("Telemetry store"))?;
        let event_bus = self.event_bus.ok_or_else(|| missing("Event bus"))?;

        let profile = profiles.active().await?;
        let controller = GestureController::from_profile(&profile, self.smoothing)?;
        source
            .apply_detector_settings(DetectorSettings::from(&profile))
            .await?;

        let requests = event_bus.subscribe_filtered(
            EventFilter::EventTypes(vec![
                "profile_activated",
                "profile_cycle_requested",
                "overlay_help_toggled",
            ]),
            "frame_loop",
        );

        debug!(
            "Frame loop ready: emitter '{}', profile '{}'",
            dispatcher.emitter_name(),
            profile.name
        );

        Ok(FrameLoop {
            source,
            controller,
            dispatcher,
            fps: FpsMeter::new(Instant::now()),
            profiles,
            telemetry,
            event_bus,
            requests,
            smoothing: self.smoothing,
            publish_interval: self.publish_interval,
            last_publish: None,
            max_consecutive_failures: self.max_consecutive_failures,
            consecutive_failures: 0,
            show_help: self.show_help,
            stats: FrameLoopStats::default(),
        })
    }
}

impl Default for FrameLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(what: &str) -> GesturepadError {
    GesturepadError::component("frame_loop", format!("{} is required", what))
}
