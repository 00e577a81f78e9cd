use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of keypoints the hand-landmark detector reports per hand
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_MCP: usize = 2;
pub const THUMB_TIP: usize = 4;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_PIP: usize = 14;
pub const RING_TIP: usize = 16;
pub const PINKY_PIP: usize = 18;
pub const PINKY_TIP: usize = 20;

/// Bone segments between landmark indices, used to draw the hand skeleton
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (5, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (9, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (13, 17),
    (17, 18),
    (18, 19),
    (19, 20),
    (0, 17),
];

/// A normalized image-space keypoint. `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
}

impl Landmark {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("expected {LANDMARK_COUNT} landmarks per hand, got {0}")]
pub struct LandmarkCountError(pub usize);

/// The 21 landmarks of one detected hand
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandLandmarks([Landmark; LANDMARK_COUNT]);

impl HandLandmarks {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        Self(points)
    }

    pub fn point(&self, index: usize) -> Landmark {
        self.0[index]
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.0
    }

    /// Flip horizontally, for sources that deliver an unmirrored camera view
    pub fn mirrored(&self) -> Self {
        let mut points = self.0;
        for point in points.iter_mut() {
            point.x = 1.0 - point.x;
        }
        Self(points)
    }

    /// Fabricate an upright hand with the requested fingers extended and its
    /// weighted center at `center_x`. Used by the demo source and by tests.
    pub fn synthetic(fingers: [bool; 5], center_x: f64) -> Self {
        let mut points = [Landmark::new(center_x, 0.8); LANDMARK_COUNT];

        points[WRIST] = Landmark::new(center_x, 0.8);
        points[THUMB_MCP] = Landmark::new(center_x, 0.55);
        points[THUMB_TIP] = Landmark::new(center_x, if fingers[0] { 0.42 } else { 0.75 });

        let joints = [
            (INDEX_PIP, INDEX_TIP),
            (MIDDLE_PIP, MIDDLE_TIP),
            (RING_PIP, RING_TIP),
            (PINKY_PIP, PINKY_TIP),
        ];
        for (offset, (pip, tip)) in joints.into_iter().enumerate() {
            let x = center_x + (offset as f64 - 1.0) * 0.01;
            points[pip] = Landmark::new(x, 0.58);
            points[tip] = Landmark::new(x, if fingers[offset + 1] { 0.38 } else { 0.74 });
        }
        // keep the weighted center exact: wrist and thumb tip sit on center_x,
        // so the index tip must too
        points[INDEX_TIP].x = center_x;

        Self(points)
    }
}

impl TryFrom<Vec<Landmark>> for HandLandmarks {
    type Error = LandmarkCountError;

    fn try_from(points: Vec<Landmark>) -> Result<Self, Self::Error> {
        let len = points.len();
        let points: [Landmark; LANDMARK_COUNT] =
            points.try_into().map_err(|_| LandmarkCountError(len))?;
        Ok(Self(points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_rejects_wrong_count() {
        let points = vec![Landmark::default(); 20];
        assert_eq!(
            HandLandmarks::try_from(points).unwrap_err(),
            LandmarkCountError(20)
        );

        let points = vec![Landmark::default(); LANDMARK_COUNT];
        assert!(HandLandmarks::try_from(points).is_ok());
    }

    #[test]
    fn test_deserialize_requires_21_points() {
        let short = serde_json::json!([{ "x": 0.1, "y": 0.2 }]);
        assert!(serde_json::from_value::<HandLandmarks>(short).is_err());

        let full: Vec<_> = (0..LANDMARK_COUNT)
            .map(|i| serde_json::json!({ "x": i as f64 / 100.0, "y": 0.5, "z": -0.1 }))
            .collect();
        let hand: HandLandmarks = serde_json::from_value(serde_json::Value::Array(full)).unwrap();
        assert_eq!(hand.point(INDEX_TIP).x, 0.08);
    }

    #[test]
    fn test_mirrored_flips_x_only() {
        let hand = HandLandmarks::synthetic([false; 5], 0.2);
        let mirrored = hand.mirrored();
        assert!((mirrored.point(WRIST).x - 0.8).abs() < 1e-12);
        assert_eq!(mirrored.point(WRIST).y, hand.point(WRIST).y);
    }
}
