use super::action::Action;
use super::landmarks::{
    HandLandmarks, INDEX_PIP, INDEX_TIP, MIDDLE_PIP, MIDDLE_TIP, PINKY_PIP, PINKY_TIP, RING_PIP,
    RING_TIP, THUMB_MCP, THUMB_TIP, WRIST,
};
use super::lane::LaneBounds;
use crate::error::{GesturepadError, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;

pub const DEFAULT_SMOOTHING: f64 = 0.22;

const WRIST_WEIGHT: f64 = 0.4;
const INDEX_TIP_WEIGHT: f64 = 0.3;
const THUMB_TIP_WEIGHT: f64 = 0.3;

/// Extended/curled flags in thumb, index, middle, ring, pinky order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerState([bool; 5]);

impl FingerState {
    pub const fn new(fingers: [bool; 5]) -> Self {
        Self(fingers)
    }

    /// Vertical heuristic: a finger is extended when its tip sits above its
    /// reference joint (MCP for the thumb, PIP for the others). Assumes an
    /// upright hand; rotated hands are misclassified.
    pub fn from_landmarks(hand: &HandLandmarks) -> Self {
        let above = |tip: usize, joint: usize| hand.point(tip).y < hand.point(joint).y;
        Self([
            above(THUMB_TIP, THUMB_MCP),
            above(INDEX_TIP, INDEX_PIP),
            above(MIDDLE_TIP, MIDDLE_PIP),
            above(RING_TIP, RING_PIP),
            above(PINKY_TIP, PINKY_PIP),
        ])
    }

    pub fn thumb(&self) -> bool {
        self.0[0]
    }
    pub fn index(&self) -> bool {
        self.0[1]
    }
    pub fn middle(&self) -> bool {
        self.0[2]
    }
    pub fn ring(&self) -> bool {
        self.0[3]
    }
    pub fn pinky(&self) -> bool {
        self.0[4]
    }

    pub fn as_array(&self) -> [bool; 5] {
        self.0
    }

    pub fn extended_count(&self) -> usize {
        self.0.iter().filter(|f| **f).count()
    }
}

/// Per-frame classification result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureSnapshot {
    pub action: Action,
    pub center_x: f64,
    pub fingers: FingerState,
    pub has_hand: bool,
}

impl GestureSnapshot {
    pub fn no_hand() -> Self {
        Self {
            action: Action::Idle,
            center_x: 0.5,
            fingers: FingerState::default(),
            has_hand: false,
        }
    }
}

impl Default for GestureSnapshot {
    fn default() -> Self {
        Self::no_hand()
    }
}

/// First-order low-pass filter; the first sample after a reset passes through
#[derive(Debug, Clone, Copy)]
pub struct ExponentialSmoother {
    alpha: f64,
    value: Option<f64>,
}

impl ExponentialSmoother {
    pub fn new(alpha: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(GesturepadError::invalid_configuration(format!(
                "smoothing must be between 0.0 and 1.0 (got {})",
                alpha
            )));
        }
        Ok(Self { alpha, value: None })
    }

    pub fn update(&mut self, raw: f64) -> f64 {
        let next = match self.value {
            None => raw,
            Some(previous) => (1.0 - self.alpha) * previous + self.alpha * raw,
        };
        self.value = Some(next);
        next
    }

    pub fn reset(&mut self) {
        self.value = None;
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

type GestureGuard = fn(&FingerState) -> bool;

fn jump_pose(f: &FingerState) -> bool {
    f.extended_count() == 5
}

fn slide_pose(f: &FingerState) -> bool {
    f.thumb() && f.pinky() && !f.index() && !f.middle() && !f.ring()
}

fn hoverboard_pose(f: &FingerState) -> bool {
    f.index() && f.middle() && !f.thumb() && !f.ring() && !f.pinky()
}

/// Finger-pose rules in precedence order. Overlaps are resolved by position,
/// and every pose outranks the lane zones.
const GESTURE_RULES: [(Action, GestureGuard); 3] = [
    (Action::Jump, jump_pose),
    (Action::Slide, slide_pose),
    (Action::Hoverboard, hoverboard_pose),
];

/// Turns hand landmarks into a classified action plus a smoothed hand-center
#[derive(Debug, Clone)]
pub struct GestureInterpreter {
    bounds: LaneBounds,
    smoother: ExponentialSmoother,
}

impl GestureInterpreter {
    pub fn new(left_bound: f64, right_bound: f64, smoothing: f64) -> Result<Self> {
        Ok(Self {
            bounds: LaneBounds::new(left_bound, right_bound)?,
            smoother: ExponentialSmoother::new(smoothing)?,
        })
    }

    pub fn bounds(&self) -> LaneBounds {
        self.bounds
    }

    pub fn smoothing(&self) -> f64 {
        self.smoother.alpha()
    }

    /// Replace the lane thresholds; on error the previous bounds stay in place
    pub fn update_bounds(&mut self, left_bound: f64, right_bound: f64) -> Result<()> {
        self.bounds = LaneBounds::new(left_bound, right_bound)?;
        Ok(())
    }

    /// Classify one frame. Only the first hand is considered.
    pub fn interpret(&mut self, hands: &[HandLandmarks]) -> GestureSnapshot {
        let Some(hand) = hands.first() else {
            self.smoother.reset();
            return GestureSnapshot::no_hand();
        };

        let fingers = FingerState::from_landmarks(hand);
        let raw_center = weighted_center_x(hand);
        let center_x = self.smoother.update(raw_center);
        let action = self.resolve_action(&fingers, center_x);

        trace!(
            "Interpreted hand: fingers={:?} raw_center={:.4} smoothed={:.4} action={}",
            fingers.as_array(),
            raw_center,
            center_x,
            action
        );

        GestureSnapshot {
            action,
            center_x,
            fingers,
            has_hand: true,
        }
    }

    pub fn resolve_action(&self, fingers: &FingerState, center_x: f64) -> Action {
        GESTURE_RULES
            .iter()
            .find(|(_, guard)| guard(fingers))
            .map(|(action, _)| *action)
            .unwrap_or_else(|| self.bounds.lane_for(center_x).action())
    }
}

/// Wrist plus the thumb and index tips, so single-digit motion barely moves the lane
pub fn weighted_center_x(hand: &HandLandmarks) -> f64 {
    hand.point(WRIST).x * WRIST_WEIGHT
        + hand.point(INDEX_TIP).x * INDEX_TIP_WEIGHT
        + hand.point(THUMB_TIP).x * THUMB_TIP_WEIGHT
}
