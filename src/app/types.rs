use serde::{Deserialize, Serialize};

/// Component lifecycle states
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

/// System shutdown reason
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    Signal(String),
    /// Published on the event bus by a hotkey or a finished component
    Requested(String),
}

/// Which parts of the system to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Landmarks in, key pulses out
    Controller,
    /// HTTP API and dashboard only
    Api,
    /// Controller plus API
    All,
}

impl RunMode {
    pub fn runs_controller(self) -> bool {
        matches!(self, RunMode::Controller | RunMode::All)
    }

    pub fn runs_api(self) -> bool {
        matches!(self, RunMode::Api | RunMode::All)
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunMode::Controller => "controller",
            RunMode::Api => "api",
            RunMode::All => "all",
        };
        f.write_str(name)
    }
}
