use super::runner::FrameLoopBuilder;
use super::{ComponentState, GesturepadOrchestrator};
use crate::error::{GesturepadError, Result};
use crate::events::{EventBus, GesturepadEvent};
use crate::input::{create_emitter, ActionDispatcher, KeyMap};
use crate::keyboard_input::HotkeyListener;
use crate::source::open_source;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{error, info, warn};

impl GesturepadOrchestrator {
    /// Register components for the selected mode and build the frame loop.
    /// Source and emitter failures surface here, before anything runs.
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing Gesturepad components");

        if let Some(name) = self.initial_profile.take() {
            self.profiles.activate(&name).await?;
        }

        let mut states = self.component_states.lock().await;
        if self.mode.runs_controller() {
            states.insert("frame_loop".to_string(), ComponentState::Stopped);
        }
        if self.mode.runs_api() {
            states.insert("api".to_string(), ComponentState::Stopped);
        }
        if self.hotkeys_enabled {
            states.insert("hotkeys".to_string(), ComponentState::Stopped);
        }
        drop(states);

        if self.mode.runs_api() && !cfg!(feature = "api") {
            return Err(GesturepadError::invalid_configuration(
                "API mode requested but HTTP support was not compiled in",
            ));
        }

        if self.mode.runs_controller() {
            let source = match self.source_override.take() {
                Some(source) => source,
                None => open_source(&self.config.source).await?,
            };

            let keymap = KeyMap::from_config(&self.config.keys)?;
            let emitter = match self.emitter_override.take() {
                Some(emitter) => emitter,
                None => create_emitter(&keymap, self.config.system.dry_run_input)?,
            };

            let frame_loop = FrameLoopBuilder::new()
                .settings(&self.config)
                .source(source)
                .dispatcher(ActionDispatcher::new(keymap, emitter))
                .profiles(self.profiles.clone())
                .telemetry(Arc::clone(&self.telemetry))
                .event_bus(Arc::clone(&self.event_bus))
                .build()
                .await?;
            self.frame_loop = Some(frame_loop);
        }

        if self.hotkeys_enabled {
            self.hotkeys = Some(HotkeyListener::new(Arc::clone(&self.event_bus)));
        }

        info!("All components initialized successfully");
        Ok(())
    }

    /// Start every initialized component in the background
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting Gesturepad in '{}' mode", self.mode);

        #[cfg(feature = "api")]
        {
            if self.mode.runs_api() {
                self.start_api().await?;
            }
        }

        if let Some(mut frame_loop) = self.frame_loop.take() {
            self.set_component_state("frame_loop", ComponentState::Starting)
                .await;

            let event_bus = Arc::clone(&self.event_bus);
            let cancel = self.cancellation_token.child_token();
            self.frame_loop_task = Some(tokio::spawn(async move {
                let result = frame_loop.run(cancel).await;
                let reason = match &result {
                    Ok(_) => "Landmark stream ended".to_string(),
                    Err(e) => format!("Frame loop failed: {}", e),
                };
                request_shutdown(&event_bus, reason).await;
                result
            }));

            self.set_component_state("frame_loop", ComponentState::Running)
                .await;
            info!("Frame loop started");
        }

        if let Some(hotkeys) = &self.hotkeys {
            self.set_component_state("hotkeys", ComponentState::Starting)
                .await;

            hotkeys.start().await.map_err(|e| {
                error!("Failed to start hotkey listener: {}", e);
                e
            })?;

            self.set_component_state("hotkeys", ComponentState::Running)
                .await;
        }

        info!("Gesturepad started successfully");
        Ok(())
    }

    #[cfg(feature = "api")]
    async fn start_api(&mut self) -> Result<()> {
        use crate::api::ApiServerBuilder;

        self.set_component_state("api", ComponentState::Starting)
            .await;

        let server = ApiServerBuilder::new()
            .config(Arc::clone(&self.config))
            .profiles(self.profiles.clone())
            .telemetry(Arc::clone(&self.telemetry))
            .event_bus(Arc::clone(&self.event_bus))
            .build()?;
        let address = server.address();

        let event_bus = Arc::clone(&self.event_bus);
        let shutdown = self.cancellation_token.child_token();
        self.api_task = Some(tokio::spawn(async move {
            let result = server.start(shutdown).await;
            if let Err(e) = &result {
                error!("API server error: {}", e);
                request_shutdown(&event_bus, format!("API server failed: {}", e)).await;
            }
            result
        }));

        self.set_component_state("api", ComponentState::Running)
            .await;
        info!("API server started on {}", address);
        Ok(())
    }
}

async fn request_shutdown(event_bus: &EventBus, reason: String) {
    let event = GesturepadEvent::ShutdownRequested {
        timestamp: SystemTime::now(),
        reason,
    };
    if let Err(e) = event_bus.publish(event).await {
        warn!("Failed to request shutdown: {}", e);
    }
}
