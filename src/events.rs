use crate::error::EventBusError;
use crate::gesture::Action;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Events exchanged between the frame loop, the API and the hotkey listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GesturepadEvent {
    /// An approved action was sent to the input emitter
    ActionEmitted {
        action: Action,
        profile: String,
        timestamp: SystemTime,
    },
    /// A profile was activated and the frame loop should rebuild its controller
    ProfileActivated { name: String },
    /// Switch to the next stored profile
    ProfileCycleRequested { timestamp: SystemTime },
    /// Show or hide the overlay help legend
    OverlayHelpToggled { timestamp: SystemTime },
    /// The landmark source connected, disconnected or reached end of stream
    SourceStatusChanged {
        connected: bool,
        description: String,
        timestamp: SystemTime,
    },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl GesturepadEvent {
    pub fn description(&self) -> String {
        match self {
            GesturepadEvent::ActionEmitted {
                action, profile, ..
            } => {
                format!("Action {} emitted ({})", action, profile)
            }
            GesturepadEvent::ProfileActivated { name } => {
                format!("Profile '{}' activated", name)
            }
            GesturepadEvent::ProfileCycleRequested { .. } => "Profile cycle requested".to_string(),
            GesturepadEvent::OverlayHelpToggled { .. } => "Overlay help toggled".to_string(),
            GesturepadEvent::SourceStatusChanged {
                connected,
                description,
                ..
            } => {
                format!(
                    "Landmark source {} {}",
                    description,
                    if *connected {
                        "connected"
                    } else {
                        "disconnected"
                    }
                )
            }
            GesturepadEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            GesturepadEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            GesturepadEvent::ActionEmitted { .. } => "action_emitted",
            GesturepadEvent::ProfileActivated { .. } => "profile_activated",
            GesturepadEvent::ProfileCycleRequested { .. } => "profile_cycle_requested",
            GesturepadEvent::OverlayHelpToggled { .. } => "overlay_help_toggled",
            GesturepadEvent::SourceStatusChanged { .. } => "source_status_changed",
            GesturepadEvent::SystemError { .. } => "system_error",
            GesturepadEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Broadcast-channel bus shared by every component
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GesturepadEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GesturepadEvent> {
        self.sender.subscribe()
    }

    /// Subscribe through a filter, for components that only care about a few event types
    pub fn subscribe_filtered(&self, filter: EventFilter, name: &str) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), filter, name.to_string())
    }

    /// Publish an event to all subscribers. Fails when nobody is listening.
    pub async fn publish(&self, event: GesturepadEvent) -> Result<usize, EventBusError> {
        match &event {
            GesturepadEvent::ProfileActivated { name } => {
                info!("Profile '{}' activated", name);
            }
            GesturepadEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            GesturepadEvent::SourceStatusChanged {
                connected,
                description,
                ..
            } => {
                if *connected {
                    info!("Landmark source {} connected", description);
                } else {
                    warn!("Landmark source {} disconnected", description);
                }
            }
            GesturepadEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => debug!("Event: {}", event.description()),
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }
}

#[derive(Debug, Clone)]
pub enum EventFilter {
    EventTypes(Vec<&'static str>),
}

impl EventFilter {
    pub fn matches(&self, event: &GesturepadEvent) -> bool {
        match self {
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
        }
    }
}

/// Receiver that skips events its filter rejects
pub struct EventReceiver {
    receiver: broadcast::Receiver<GesturepadEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<GesturepadEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    pub async fn recv(&mut self) -> Result<GesturepadEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Non-blocking receive; `Ok(None)` when nothing matching is queued
    pub fn try_recv(&mut self) -> Result<Option<GesturepadEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    return Ok(None);
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}
