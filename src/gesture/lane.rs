use super::action::Lane;
use crate::error::{GesturepadError, Result};
use serde::Serialize;

pub const MIN_BOUND: f64 = 0.05;
pub const MAX_BOUND: f64 = 0.95;

/// Lane thresholds on the smoothed hand-center, `MIN_BOUND <= left < right <= MAX_BOUND`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LaneBounds {
    left: f64,
    right: f64,
}

impl LaneBounds {
    pub fn new(left: f64, right: f64) -> Result<Self> {
        // written so that NaN fails too
        if !(MIN_BOUND <= left && left < right && right <= MAX_BOUND) {
            return Err(GesturepadError::invalid_configuration(format!(
                "lane boundaries must satisfy {} <= left < right <= {} (got left={}, right={})",
                MIN_BOUND, MAX_BOUND, left, right
            )));
        }
        Ok(Self { left, right })
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn right(&self) -> f64 {
        self.right
    }

    /// Zone for a center coordinate; values exactly on a bound stay in the center
    pub fn lane_for(&self, center_x: f64) -> Lane {
        if center_x < self.left {
            Lane::Left
        } else if center_x > self.right {
            Lane::Right
        } else {
            Lane::Center
        }
    }
}

impl Default for LaneBounds {
    fn default() -> Self {
        Self {
            left: 0.35,
            right: 0.65,
        }
    }
}

/// Last committed lane. Starts in the center and only moves on a confirmed transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct LaneState {
    committed: Lane,
}

impl LaneState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn committed(&self) -> Lane {
        self.committed
    }

    pub fn is_transition(&self, lane: Lane) -> bool {
        lane != self.committed
    }

    pub fn commit(&mut self, lane: Lane) {
        self.committed = lane;
    }
}
