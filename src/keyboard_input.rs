use crate::error::Result;
use crate::events::{EventBus, GesturepadEvent};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Terminal hotkeys understood by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hotkey {
    Quit,
    NextProfile,
    ToggleHelp,
}

impl Hotkey {
    pub fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Self::Quit),
            KeyCode::Char('p') | KeyCode::Char('P') => Some(Self::NextProfile),
            KeyCode::Char('h') | KeyCode::Char('H') => Some(Self::ToggleHelp),
            _ => None,
        }
    }

    pub fn into_event(self) -> GesturepadEvent {
        let timestamp = SystemTime::now();
        match self {
            Self::Quit => GesturepadEvent::ShutdownRequested {
                timestamp,
                reason: "User requested via keyboard".to_string(),
            },
            Self::NextProfile => GesturepadEvent::ProfileCycleRequested { timestamp },
            Self::ToggleHelp => GesturepadEvent::OverlayHelpToggled { timestamp },
        }
    }
}

/// Reads hotkeys from the controlling terminal in raw mode
pub struct HotkeyListener {
    event_bus: Arc<EventBus>,
    cancellation_token: CancellationToken,
}

impl HotkeyListener {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            event_bus,
            cancellation_token: CancellationToken::new(),
        }
    }

    pub async fn start(&self) -> Result<()> {
        info!("Starting hotkey listener - q quits, p cycles profiles, h toggles help");

        let event_bus = Arc::clone(&self.event_bus);
        let cancellation_token = self.cancellation_token.clone();
        let runtime_handle = Handle::current();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for hotkeys: {}", e);
                return;
            }

            debug!("Raw mode enabled - hotkey listener active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Hotkey listener stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let key_event = match event::read() {
                            Ok(Event::Key(key_event)) if key_event.kind == KeyEventKind::Press => {
                                key_event
                            }
                            _ => continue,
                        };

                        let Some(hotkey) = Hotkey::from_key(key_event.code) else {
                            debug!("Ignoring key {:?}", key_event.code);
                            continue;
                        };

                        info!("Hotkey pressed: {:?}", hotkey);
                        let event_bus = Arc::clone(&event_bus);
                        runtime_handle.spawn(async move {
                            if let Err(e) = event_bus.publish(hotkey.into_event()).await {
                                warn!("Failed to publish hotkey event: {}", e);
                            }
                        });

                        if hotkey == Hotkey::Quit {
                            break;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            }

            debug!("Hotkey listener task exited");
        });

        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping hotkey listener");
        self.cancellation_token.cancel();

        // Give the blocking task a poll interval to restore the terminal
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();

        Ok(())
    }
}
