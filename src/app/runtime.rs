use super::{GesturepadOrchestrator, ShutdownReason};
use crate::error::{GesturepadError, Result};
use crate::events::GesturepadEvent;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};

type SharedSender = Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>;

impl GesturepadOrchestrator {
    /// Run until a signal or a shutdown request arrives, then shut down.
    /// Returns the process exit code; 1 when a component failed.
    pub async fn run(&mut self) -> Result<i32> {
        info!("Gesturepad is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| GesturepadError::system("Shutdown sender already taken"))?;

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| GesturepadError::system("Shutdown receiver already taken"))?;

        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));
        self.setup_signal_handlers(&shutdown_sender);
        self.watch_shutdown_requests(&shutdown_sender);

        let shutdown_reason = shutdown_receiver
            .await
            .map_err(|_| GesturepadError::system("Shutdown channel closed unexpectedly"))?;

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let exit_code = self.shutdown().await?;

        info!("Gesturepad shutdown complete");
        Ok(exit_code)
    }

    fn setup_signal_handlers(&self, shutdown_sender: &SharedSender) {
        #[cfg(unix)]
        {
            let sender = Arc::clone(shutdown_sender);
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };
                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    send_reason(&sender, ShutdownReason::Signal("SIGTERM".to_string())).await;
                }
            });
        }

        let sender = Arc::clone(shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                send_reason(&sender, ShutdownReason::Signal("SIGINT".to_string())).await;
            }
        });
    }

    /// Hotkeys and finished components ask for shutdown over the event bus
    fn watch_shutdown_requests(&mut self, shutdown_sender: &SharedSender) {
        let Some(mut requests) = self.shutdown_requests.take() else {
            return;
        };

        let sender = Arc::clone(shutdown_sender);
        tokio::spawn(async move {
            loop {
                match requests.recv().await {
                    Ok(GesturepadEvent::ShutdownRequested { reason, .. }) => {
                        send_reason(&sender, ShutdownReason::Requested(reason)).await;
                        break;
                    }
                    Ok(_) => {}
                    Err(crate::error::EventBusError::ChannelClosed) => break,
                    Err(e) => warn!("Shutdown watcher: {}", e),
                }
            }
        });
    }
}

async fn send_reason(sender: &SharedSender, reason: ShutdownReason) {
    if let Some(sender) = sender.lock().await.take() {
        let _ = sender.send(reason);
    }
}
