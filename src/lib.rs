pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod gesture;
pub mod input;
pub mod keyboard_input;
pub mod profile;
pub mod source;
pub mod telemetry;

#[cfg(feature = "api")]
pub mod api;

#[cfg(feature = "overlay")]
pub mod overlay;

pub use app::{ComponentState, GesturepadOrchestrator, RunMode, ShutdownReason};
pub use config::{GesturepadConfig, SourceKind};
pub use error::{GesturepadError, Result};
pub use events::{EventBus, EventFilter, EventReceiver, GesturepadEvent};
pub use gesture::{Action, GestureController, GestureSnapshot, HandLandmarks, Lane, LaneBounds};
pub use input::{ActionDispatcher, InputEmitter, KeyMap, KeyToken};
pub use keyboard_input::{Hotkey, HotkeyListener};
pub use profile::{Profile, ProfileStore};
pub use source::{LandmarkFrame, LandmarkSource};
pub use telemetry::{TelemetrySnapshot, TelemetryStore};

#[cfg(feature = "api")]
pub use api::{ApiServer, ApiServerBuilder};

#[cfg(feature = "overlay")]
pub use overlay::OverlayRenderer;
