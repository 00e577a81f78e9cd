mod orchestrator;
mod runner;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use orchestrator::GesturepadOrchestrator;
pub use runner::{FrameLoop, FrameLoopBuilder, FrameLoopStats};
pub use types::{ComponentState, RunMode, ShutdownReason};
