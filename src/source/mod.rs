mod frame;
mod jsonl;
mod scripted;

pub use frame::LandmarkFrame;
pub use jsonl::JsonLinesSource;
pub use scripted::ScriptedSource;

use crate::config::{SourceConfig, SourceKind};
use crate::error::{Result, SourceError};
use crate::profile::Profile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Detector thresholds carried by a profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorSettings {
    pub detection_confidence: f64,
    pub presence_confidence: f64,
    pub tracking_confidence: f64,
}

impl From<&Profile> for DetectorSettings {
    fn from(profile: &Profile) -> Self {
        Self {
            detection_confidence: profile.detection_confidence,
            presence_confidence: profile.presence_confidence,
            tracking_confidence: profile.tracking_confidence,
        }
    }
}

/// Supplies landmark frames to the frame loop
#[async_trait]
pub trait LandmarkSource: Send {
    /// The next frame, `Ok(None)` once the stream has ended. An error is a
    /// fault for this frame only; the caller decides whether to keep reading.
    async fn next_frame(&mut self) -> std::result::Result<Option<LandmarkFrame>, SourceError>;

    /// Forward profile thresholds to whatever runs the detector
    async fn apply_detector_settings(
        &mut self,
        settings: DetectorSettings,
    ) -> std::result::Result<(), SourceError>;

    fn describe(&self) -> String;
}

/// Open the source selected in the configuration
pub async fn open_source(config: &SourceConfig) -> Result<Box<dyn LandmarkSource>> {
    let pacing = Duration::from_millis(config.frame_interval_ms);
    let source: Box<dyn LandmarkSource> = match config.kind {
        SourceKind::Stdin => Box::new(JsonLinesSource::stdin().with_mirror(config.mirror)),
        SourceKind::File => Box::new(
            JsonLinesSource::open_file(&config.path)
                .await?
                .with_mirror(config.mirror)
                .with_frame_interval(pacing),
        ),
        SourceKind::Tcp => Box::new(
            JsonLinesSource::connect(&config.address)
                .await?
                .with_mirror(config.mirror),
        ),
        SourceKind::Scripted => Box::new(ScriptedSource::demo().with_frame_interval(pacing)),
    };
    Ok(source)
}
