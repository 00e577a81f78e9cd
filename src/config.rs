use crate::input::KeyMap;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GesturepadConfig {
    pub source: SourceConfig,
    pub gesture: GestureConfig,
    pub keys: KeyConfig,
    pub profiles: ProfilesConfig,
    pub telemetry: TelemetryConfig,
    pub api: ApiConfig,
    pub overlay: OverlayConfig,
    pub logging: LoggingConfig,
    pub system: SystemConfig,
}

/// Where landmark frames come from
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// JSON lines on standard input
    Stdin,
    /// JSON lines replayed from a file
    File,
    /// JSON lines from a detector sidecar over TCP
    Tcp,
    /// Built-in demo script
    Scripted,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_source_kind")]
    pub kind: SourceKind,

    /// Recording replayed by the `file` source
    #[serde(default = "default_source_path")]
    pub path: String,

    /// Sidecar address for the `tcp` source
    #[serde(default = "default_source_address")]
    pub address: String,

    /// Flip x coordinates for detectors that report un-mirrored camera frames
    #[serde(default)]
    pub mirror: bool,

    /// Consecutive unreadable frames tolerated before the loop gives up
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Frame pacing for the file and scripted sources (0 = as fast as possible)
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GestureConfig {
    /// EMA weight on the raw hand center
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,
}

/// Key tokens per action: `up`, `down`, `left`, `right`, `space` or a single letter/digit
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KeyConfig {
    #[serde(default = "default_key_jump")]
    pub jump: String,

    #[serde(default = "default_key_slide")]
    pub slide: String,

    #[serde(default = "default_key_left")]
    pub left: String,

    #[serde(default = "default_key_right")]
    pub right: String,

    #[serde(default = "default_key_hoverboard")]
    pub hoverboard: String,

    /// Unbound unless set; returning to the center lane then presses nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProfilesConfig {
    #[serde(default = "default_profiles_directory")]
    pub directory: String,

    #[serde(default = "default_active_file")]
    pub active_file: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_file")]
    pub file: String,

    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Minimum spacing between two published snapshots
    #[serde(default = "default_publish_interval_ms")]
    pub publish_interval_ms: u64,

    /// Write the history to `file` after every publish
    #[serde(default = "default_persist")]
    pub persist: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,

    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Required in the `x-api-key` header when non-empty
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_allow_origins")]
    pub allow_origins: Vec<String>,

    /// Static dashboard served under `/dashboard/`
    #[serde(default = "default_dashboard_dir")]
    pub dashboard_dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OverlayConfig {
    #[serde(default = "default_overlay_enabled")]
    pub enabled: bool,

    #[serde(default = "default_overlay_width")]
    pub width: u32,

    #[serde(default = "default_overlay_height")]
    pub height: u32,

    /// TrueType font for header text; text is skipped when it cannot be loaded
    #[serde(default = "default_font_path")]
    pub font_path: String,

    #[serde(default = "default_font_size")]
    pub font_size: f32,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Initial state of the help legend (toggled with `h`)
    #[serde(default = "default_show_help")]
    pub show_help: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Used when no verbosity flag is given on the command line
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    /// Daily rolling log files are written here when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,

    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    #[serde(default = "default_shutdown_timeout_seconds")]
    pub shutdown_timeout_seconds: u64,

    /// Terminal hotkeys (q quit, p next profile, h help)
    #[serde(default)]
    pub hotkeys: bool,

    /// Log key pulses instead of writing to a virtual keyboard
    #[serde(default)]
    pub dry_run_input: bool,
}

impl GesturepadConfig {
    /// Load from `gesturepad.toml` plus the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("gesturepad.toml")
    }

    /// Defaults, then the optional TOML file, then `GESTUREPAD_SECTION__KEY` variables
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("source.kind", "stdin")?
            .set_default("source.path", default_source_path())?
            .set_default("source.address", default_source_address())?
            .set_default("source.mirror", false)?
            .set_default(
                "source.max_consecutive_failures",
                default_max_consecutive_failures(),
            )?
            .set_default(
                "source.frame_interval_ms",
                default_frame_interval_ms() as i64,
            )?
            .set_default("gesture.smoothing", default_smoothing())?
            .set_default("keys.jump", default_key_jump())?
            .set_default("keys.slide", default_key_slide())?
            .set_default("keys.left", default_key_left())?
            .set_default("keys.right", default_key_right())?
            .set_default("keys.hoverboard", default_key_hoverboard())?
            .set_default("profiles.directory", default_profiles_directory())?
            .set_default("profiles.active_file", default_active_file())?
            .set_default("telemetry.file", default_telemetry_file())?
            .set_default("telemetry.max_history", default_max_history() as i64)?
            .set_default(
                "telemetry.publish_interval_ms",
                default_publish_interval_ms() as i64,
            )?
            .set_default("telemetry.persist", default_persist())?
            .set_default("api.host", default_api_host())?
            .set_default("api.port", default_api_port())?
            .set_default("api.api_key", "")?
            .set_default("api.allow_origins", default_allow_origins())?
            .set_default("api.dashboard_dir", default_dashboard_dir())?
            .set_default("overlay.enabled", default_overlay_enabled())?
            .set_default("overlay.width", default_overlay_width())?
            .set_default("overlay.height", default_overlay_height())?
            .set_default("overlay.font_path", default_font_path())?
            .set_default("overlay.font_size", default_font_size() as f64)?
            .set_default("overlay.jpeg_quality", default_jpeg_quality() as i64)?
            .set_default("overlay.show_help", default_show_help())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .set_default("logging.file_prefix", default_log_file_prefix())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default(
                "system.shutdown_timeout_seconds",
                default_shutdown_timeout_seconds() as i64,
            )?
            .set_default("system.hotkeys", false)?
            .set_default("system.dry_run_input", false)?
            .add_source(File::with_name(&path_str).required(false))
            // GESTUREPAD_API__PORT=9000, GESTUREPAD_API__ALLOW_ORIGINS=a,b
            .add_source(
                Environment::with_prefix("GESTUREPAD")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("api.allow_origins")
                    .try_parsing(true),
            )
            .build()?;

        let config: GesturepadConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.max_consecutive_failures == 0 {
            return Err(ConfigError::Message(
                "source.max_consecutive_failures must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.gesture.smoothing) {
            return Err(ConfigError::Message(format!(
                "gesture.smoothing must be between 0.0 and 1.0 (got {})",
                self.gesture.smoothing
            )));
        }

        KeyMap::from_config(&self.keys).map_err(|e| ConfigError::Message(e.to_string()))?;

        if self.telemetry.max_history == 0 {
            return Err(ConfigError::Message(
                "telemetry.max_history must be greater than 0".to_string(),
            ));
        }

        if self.telemetry.publish_interval_ms == 0 {
            return Err(ConfigError::Message(
                "telemetry.publish_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.api.port == 0 {
            return Err(ConfigError::Message(
                "api.port must be greater than 0".to_string(),
            ));
        }

        if self.overlay.width < 160 || self.overlay.height < 120 {
            return Err(ConfigError::Message(
                "overlay size must be at least 160x120".to_string(),
            ));
        }

        if !(1..=100).contains(&self.overlay.jpeg_quality) {
            return Err(ConfigError::Message(
                "overlay.jpeg_quality must be between 1 and 100".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty" | "compact") {
            return Err(ConfigError::Message(format!(
                "logging.format must be json, pretty or compact (got '{}')",
                self.logging.format
            )));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for GesturepadConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                kind: default_source_kind(),
                path: default_source_path(),
                address: default_source_address(),
                mirror: false,
                max_consecutive_failures: default_max_consecutive_failures(),
                frame_interval_ms: default_frame_interval_ms(),
            },
            gesture: GestureConfig {
                smoothing: default_smoothing(),
            },
            keys: KeyConfig {
                jump: default_key_jump(),
                slide: default_key_slide(),
                left: default_key_left(),
                right: default_key_right(),
                hoverboard: default_key_hoverboard(),
                center: None,
            },
            profiles: ProfilesConfig {
                directory: default_profiles_directory(),
                active_file: default_active_file(),
            },
            telemetry: TelemetryConfig {
                file: default_telemetry_file(),
                max_history: default_max_history(),
                publish_interval_ms: default_publish_interval_ms(),
                persist: default_persist(),
            },
            api: ApiConfig {
                host: default_api_host(),
                port: default_api_port(),
                api_key: String::new(),
                allow_origins: default_allow_origins(),
                dashboard_dir: default_dashboard_dir(),
            },
            overlay: OverlayConfig {
                enabled: default_overlay_enabled(),
                width: default_overlay_width(),
                height: default_overlay_height(),
                font_path: default_font_path(),
                font_size: default_font_size(),
                jpeg_quality: default_jpeg_quality(),
                show_help: default_show_help(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
                directory: None,
                file_prefix: default_log_file_prefix(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
                shutdown_timeout_seconds: default_shutdown_timeout_seconds(),
                hotkeys: false,
                dry_run_input: false,
            },
        }
    }
}

fn default_source_kind() -> SourceKind {
    SourceKind::Stdin
}
fn default_source_path() -> String {
    "landmarks.jsonl".to_string()
}
fn default_source_address() -> String {
    "127.0.0.1:7878".to_string()
}
fn default_max_consecutive_failures() -> u32 {
    30
}
fn default_frame_interval_ms() -> u64 {
    33
}

fn default_smoothing() -> f64 {
    crate::gesture::DEFAULT_SMOOTHING
}

fn default_key_jump() -> String {
    "up".to_string()
}
fn default_key_slide() -> String {
    "down".to_string()
}
fn default_key_left() -> String {
    "left".to_string()
}
fn default_key_right() -> String {
    "right".to_string()
}
fn default_key_hoverboard() -> String {
    "space".to_string()
}

fn default_profiles_directory() -> String {
    "./profiles".to_string()
}
fn default_active_file() -> String {
    "./runtime/active_profile.txt".to_string()
}

fn default_telemetry_file() -> String {
    "./runtime/telemetry.json".to_string()
}
fn default_max_history() -> usize {
    500
}
fn default_publish_interval_ms() -> u64 {
    300
}
fn default_persist() -> bool {
    true
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}
fn default_api_port() -> u16 {
    8000
}
fn default_allow_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_dashboard_dir() -> String {
    "./dashboard".to_string()
}

fn default_overlay_enabled() -> bool {
    true
}
fn default_overlay_width() -> u32 {
    640
}
fn default_overlay_height() -> u32 {
    480
}
fn default_font_path() -> String {
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string()
}
fn default_font_size() -> f32 {
    18.0
}
fn default_jpeg_quality() -> u8 {
    80
}
fn default_show_help() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}
fn default_log_file_prefix() -> String {
    "gesturepad.log".to_string()
}

fn default_event_bus_capacity() -> usize {
    100
}
fn default_shutdown_timeout_seconds() -> u64 {
    10
}
