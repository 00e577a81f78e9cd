use crate::gesture::{Action, GestureSnapshot, HandLandmarks, LaneBounds};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Published summary of a frame, as served by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub action: Action,
    pub fps: u32,
    pub has_hand: bool,
    pub profile: String,
    /// Rounded to 4 decimals
    pub center_x: f64,
    /// UTC, ISO-8601 with second precision
    pub timestamp: String,
}

impl TelemetrySnapshot {
    pub fn new(snapshot: &GestureSnapshot, fps: u32, profile: &str) -> Self {
        Self {
            action: snapshot.action,
            fps,
            has_hand: snapshot.has_hand,
            profile: profile.to_string(),
            center_x: round4(snapshot.center_x),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Everything the overlay needs to draw the most recent frame
#[derive(Debug, Clone, PartialEq)]
pub struct LiveFrame {
    pub snapshot: GestureSnapshot,
    pub hand: Option<HandLandmarks>,
    pub fps: u32,
    pub profile: String,
    pub bounds: LaneBounds,
    pub show_help: bool,
}

impl LiveFrame {
    /// Placeholder shown before the first frame arrives
    pub fn idle(profile: &str, bounds: LaneBounds) -> Self {
        Self {
            snapshot: GestureSnapshot::no_hand(),
            hand: None,
            fps: 0,
            profile: profile.to_string(),
            bounds,
            show_help: true,
        }
    }
}
