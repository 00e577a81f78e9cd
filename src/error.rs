use thiserror::Error;

#[derive(Error, Debug)]
pub enum GesturepadError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {details}")]
    InvalidConfiguration { details: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Landmark source error: {0}")]
    Source(#[from] SourceError),

    #[error("Input emission error: {0}")]
    Input(#[from] InputError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl GesturepadError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn invalid_configuration<S: Into<String>>(details: S) -> Self {
        Self::InvalidConfiguration {
            details: details.into(),
        }
    }
}

/// Profile store failures
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Invalid profile name '{name}': only letters, numbers, '_' or '-' (1-40 chars)")]
    InvalidName { name: String },

    #[error("Profile '{name}' not found")]
    NotFound { name: String },

    #[error("{details}")]
    Validation { details: String },

    #[error("Failed to access profile storage at {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Profile file {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Landmark source failures. Per-frame faults are downgraded to "no hand"
/// by the frame loop; only open/configure failures are fatal.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open landmark source {target}: {source}")]
    Open {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read landmark frame: {0}")]
    Read(#[from] std::io::Error),

    #[error("Malformed landmark frame: {details}")]
    MalformedFrame { details: String },

    #[error("Failed to push detector settings: {details}")]
    Configure { details: String },
}

/// Keyboard emission failures
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Unknown key token '{token}'")]
    UnknownKey { token: String },

    #[error("Virtual keyboard unavailable: {details}")]
    DeviceUnavailable { details: String },

    #[error("Failed to emit key pulse: {details}")]
    EmitFailed { details: String },
}

/// HTTP server failures
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to bind {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("API server failed: {details}")]
    ServerFailed { details: String },
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event bus channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, GesturepadError>;
