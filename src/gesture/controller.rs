use super::action::Action;
use super::gate::ActionGate;
use super::interpreter::{GestureInterpreter, GestureSnapshot};
use super::landmarks::HandLandmarks;
use super::lane::LaneBounds;
use crate::error::Result;
use crate::profile::Profile;
use std::time::{Duration, Instant};
use tracing::debug;

/// Outcome of one processed frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDecision {
    pub snapshot: GestureSnapshot,
    /// Action approved for emission, if any
    pub fire: Option<Action>,
}

/// Interpreter, gate and lane state for one active profile. A profile switch
/// builds a fresh controller, so nothing carries over between profiles.
#[derive(Debug, Clone)]
pub struct GestureController {
    profile_name: String,
    interpreter: GestureInterpreter,
    gate: ActionGate,
}

impl GestureController {
    pub fn from_profile(profile: &Profile, smoothing: f64) -> Result<Self> {
        let interpreter =
            GestureInterpreter::new(profile.left_bound, profile.right_bound, smoothing)?;
        let gate = ActionGate::new(Duration::from_millis(profile.cooldown_ms));

        debug!(
            "Built gesture controller for '{}' (bounds {:.2}/{:.2}, cooldown {}ms, smoothing {})",
            profile.name, profile.left_bound, profile.right_bound, profile.cooldown_ms, smoothing
        );

        Ok(Self {
            profile_name: profile.name.clone(),
            interpreter,
            gate,
        })
    }

    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    pub fn bounds(&self) -> LaneBounds {
        self.interpreter.bounds()
    }

    pub fn cooldown(&self) -> Duration {
        self.gate.cooldown()
    }

    pub fn update_bounds(&mut self, left_bound: f64, right_bound: f64) -> Result<()> {
        self.interpreter.update_bounds(left_bound, right_bound)
    }

    pub fn process(&mut self, hands: &[HandLandmarks], now: Instant) -> FrameDecision {
        let snapshot = self.interpreter.interpret(hands);
        let fire = self
            .gate
            .should_fire(snapshot.action, now)
            .then_some(snapshot.action);

        if let Some(action) = fire {
            debug!("Approved {} at center {:.3}", action, snapshot.center_x);
        }

        FrameDecision { snapshot, fire }
    }
}
