use crate::error::SourceError;
use crate::gesture::HandLandmarks;
use serde::{Deserialize, Serialize};

/// Landmarks reported for one video frame. `{}` and `{"hands": []}` both mean no hand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    #[serde(default)]
    pub hands: Vec<HandLandmarks>,
}

impl LandmarkFrame {
    pub fn new(hands: Vec<HandLandmarks>) -> Self {
        Self { hands }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(hand: HandLandmarks) -> Self {
        Self { hands: vec![hand] }
    }

    pub fn has_hand(&self) -> bool {
        !self.hands.is_empty()
    }

    /// Parse one JSON line. Unknown keys (`z`, `timestamp_ms`, ...) are ignored;
    /// a hand without exactly 21 points makes the whole line malformed.
    pub fn parse_line(line: &str) -> Result<Self, SourceError> {
        serde_json::from_str(line).map_err(|e| SourceError::MalformedFrame {
            details: e.to_string(),
        })
    }

    pub fn mirrored(self) -> Self {
        Self {
            hands: self.hands.iter().map(HandLandmarks::mirrored).collect(),
        }
    }
}
