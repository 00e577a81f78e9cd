use crate::error::{GesturepadError, ProfileError, Result};
use crate::gesture::LaneBounds;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROFILE_NAME: &str = "default";
pub const MAX_PROFILE_NAME_LEN: usize = 40;
pub const MAX_DESCRIPTION_LEN: usize = 140;
pub const COOLDOWN_RANGE_MS: std::ops::RangeInclusive<u64> = 80..=1200;
pub const CONFIDENCE_RANGE: std::ops::RangeInclusive<f64> = 0.1..=1.0;

/// Named tuning bundle; exactly one is active at a time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,

    #[serde(default = "default_description")]
    pub description: String,

    #[serde(default = "default_left_bound")]
    pub left_bound: f64,

    #[serde(default = "default_right_bound")]
    pub right_bound: f64,

    /// Thresholds consumed by the hand detector, pushed to the landmark source on activation
    #[serde(default = "default_detection_confidence")]
    pub detection_confidence: f64,

    #[serde(default = "default_presence_confidence")]
    pub presence_confidence: f64,

    #[serde(default = "default_tracking_confidence")]
    pub tracking_confidence: f64,

    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl Profile {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            description: default_description(),
            left_bound: default_left_bound(),
            right_bound: default_right_bound(),
            detection_confidence: default_detection_confidence(),
            presence_confidence: default_presence_confidence(),
            tracking_confidence: default_tracking_confidence(),
            cooldown_ms: default_cooldown_ms(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_profile_name(&self.name)?;

        let description_len = self.description.chars().count();
        if description_len == 0 || description_len > MAX_DESCRIPTION_LEN {
            return Err(ProfileError::Validation {
                details: format!(
                    "description must be 1 to {} characters",
                    MAX_DESCRIPTION_LEN
                ),
            }
            .into());
        }

        LaneBounds::new(self.left_bound, self.right_bound)?;

        for (label, value) in [
            ("detection_confidence", self.detection_confidence),
            ("presence_confidence", self.presence_confidence),
            ("tracking_confidence", self.tracking_confidence),
        ] {
            if !CONFIDENCE_RANGE.contains(&value) {
                return Err(GesturepadError::invalid_configuration(format!(
                    "{} must be between 0.1 and 1.0 (got {})",
                    label, value
                )));
            }
        }

        if !COOLDOWN_RANGE_MS.contains(&self.cooldown_ms) {
            return Err(GesturepadError::invalid_configuration(format!(
                "cooldown_ms must be between 80 and 1200 (got {})",
                self.cooldown_ms
            )));
        }

        Ok(())
    }

    pub fn lane_bounds(&self) -> Result<LaneBounds> {
        LaneBounds::new(self.left_bound, self.right_bound)
    }
}

/// Names double as file names, so only `[A-Za-z0-9_-]{1,40}` is accepted
pub fn validate_profile_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_PROFILE_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(ProfileError::InvalidName {
            name: name.to_string(),
        }
        .into())
    }
}

fn default_description() -> String {
    "Default profile".to_string()
}
pub(crate) fn default_left_bound() -> f64 {
    0.35
}
pub(crate) fn default_right_bound() -> f64 {
    0.65
}
pub(crate) fn default_detection_confidence() -> f64 {
    0.7
}
pub(crate) fn default_presence_confidence() -> f64 {
    0.7
}
pub(crate) fn default_tracking_confidence() -> f64 {
    0.6
}
pub(crate) fn default_cooldown_ms() -> u64 {
    220
}
