use super::{ComponentState, GesturepadOrchestrator};
use crate::error::{GesturepadError, Result};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info};

impl GesturepadOrchestrator {
    /// Stop components in reverse start order. Returns 1 when any of them
    /// failed or did not stop in time.
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        self.cancellation_token.cancel();
        let limit = Duration::from_secs(self.config.system.shutdown_timeout_seconds);
        let mut exit_code = 0;

        if let Some(hotkeys) = &self.hotkeys {
            self.set_component_state("hotkeys", ComponentState::Stopping)
                .await;
            let state = match timeout(Duration::from_secs(2), hotkeys.stop()).await {
                Ok(Ok(())) => ComponentState::Stopped,
                Ok(Err(e)) => {
                    error!("Error stopping hotkeys: {}", e);
                    ComponentState::Failed
                }
                Err(_) => {
                    error!("hotkeys component stop timeout");
                    ComponentState::Failed
                }
            };
            if state == ComponentState::Failed {
                exit_code = 1;
            }
            self.set_component_state("hotkeys", state).await;
        }

        if let Some(task) = self.frame_loop_task.take() {
            match self.await_component("frame_loop", task, limit).await {
                Ok(stats) => info!(
                    "Frame loop processed {} frames and emitted {} actions",
                    stats.frames, stats.actions
                ),
                Err(e) => {
                    error!("Error stopping frame_loop: {}", e);
                    exit_code = 1;
                }
            }
        }

        if let Some(task) = self.api_task.take() {
            if let Err(e) = self.await_component("api", task, limit).await {
                error!("Error stopping api: {}", e);
                exit_code = 1;
            }
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    /// Wait for a background component task, aborting it on timeout
    async fn await_component<T>(
        &self,
        component: &str,
        mut task: JoinHandle<Result<T>>,
        limit: Duration,
    ) -> Result<T> {
        info!("Stopping {} component", component);
        self.set_component_state(component, ComponentState::Stopping)
            .await;

        let outcome = match timeout(limit, &mut task).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(join_error)) => Err(GesturepadError::component(
                component,
                format!("task panicked or was aborted: {}", join_error),
            )),
            Err(_) => {
                task.abort();
                Err(GesturepadError::component(
                    component,
                    format!("stop timeout after {:?}", limit),
                ))
            }
        };

        match &outcome {
            Ok(_) => {
                self.set_component_state(component, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", component);
            }
            Err(_) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
            }
        }
        outcome
    }
}
