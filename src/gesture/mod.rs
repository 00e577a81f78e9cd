mod action;
mod controller;
mod gate;
mod interpreter;
pub mod landmarks;
mod lane;
#[cfg(test)]
mod tests;

pub use action::{Action, Lane};
pub use controller::{FrameDecision, GestureController};
pub use gate::ActionGate;
pub use interpreter::{
    weighted_center_x, ExponentialSmoother, FingerState, GestureInterpreter, GestureSnapshot,
    DEFAULT_SMOOTHING,
};
pub use landmarks::{HandLandmarks, Landmark, LandmarkCountError, LANDMARK_COUNT};
pub use lane::{LaneBounds, LaneState, MAX_BOUND, MIN_BOUND};
