//! Pose data types
//!
//! Defines the keypoint, pose and frame records delivered by the pose
//! estimator once per video frame.

pub mod source;

use serde::{Deserialize, Serialize};

pub use source::{forward_events, JsonLinesSource, KeypointSource, SourceError, SourceEvent};

/// Body part label of a keypoint (PoseNet's 17-part layout)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyPart {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl BodyPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "leftEye",
            Self::RightEye => "rightEye",
            Self::LeftEar => "leftEar",
            Self::RightEar => "rightEar",
            Self::LeftShoulder => "leftShoulder",
            Self::RightShoulder => "rightShoulder",
            Self::LeftElbow => "leftElbow",
            Self::RightElbow => "rightElbow",
            Self::LeftWrist => "leftWrist",
            Self::RightWrist => "rightWrist",
            Self::LeftHip => "leftHip",
            Self::RightHip => "rightHip",
            Self::LeftKnee => "leftKnee",
            Self::RightKnee => "rightKnee",
            Self::LeftAnkle => "leftAnkle",
            Self::RightAnkle => "rightAnkle",
        }
    }
}

impl std::fmt::Display for BodyPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Skeleton edges drawn by the overlay (pairs of connected parts)
pub const SKELETON: [(BodyPart, BodyPart); 12] = [
    (BodyPart::LeftShoulder, BodyPart::RightShoulder),
    (BodyPart::LeftShoulder, BodyPart::LeftElbow),
    (BodyPart::LeftElbow, BodyPart::LeftWrist),
    (BodyPart::RightShoulder, BodyPart::RightElbow),
    (BodyPart::RightElbow, BodyPart::RightWrist),
    (BodyPart::LeftShoulder, BodyPart::LeftHip),
    (BodyPart::RightShoulder, BodyPart::RightHip),
    (BodyPart::LeftHip, BodyPart::RightHip),
    (BodyPart::LeftHip, BodyPart::LeftKnee),
    (BodyPart::LeftKnee, BodyPart::LeftAnkle),
    (BodyPart::RightHip, BodyPart::RightKnee),
    (BodyPart::RightKnee, BodyPart::RightAnkle),
];

/// Position in frame pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position
    pub fn distance(&self, other: &Position) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A labelled body-part observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub part: BodyPart,
    pub position: Position,
    /// Confidence in [0, 1]
    pub score: f32,
}

impl Keypoint {
    pub fn new(part: BodyPart, x: f32, y: f32, score: f32) -> Self {
        Self {
            part,
            position: Position::new(x, y),
            score,
        }
    }
}

/// Find the first keypoint for `part` whose score is strictly above `min_score`
pub fn find_part(keypoints: &[Keypoint], part: BodyPart, min_score: f32) -> Option<Keypoint> {
    keypoints
        .iter()
        .find(|kp| kp.part == part && kp.score > min_score)
        .copied()
}

/// All keypoints for one detected person
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub score: f32,
    #[serde(default)]
    pub keypoints: Vec<Keypoint>,
}

/// Everything the estimator reports for one video frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub poses: Vec<Pose>,
}

impl From<Pose> for Frame {
    fn from(pose: Pose) -> Self {
        Self { poses: vec![pose] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_labels_are_camel_case() {
        let json = serde_json::to_string(&BodyPart::LeftWrist).unwrap();
        assert_eq!(json, "\"leftWrist\"");

        let part: BodyPart = serde_json::from_str("\"rightAnkle\"").unwrap();
        assert_eq!(part, BodyPart::RightAnkle);
        assert_eq!(part.to_string(), "rightAnkle");
    }

    #[test]
    fn test_find_part_respects_threshold() {
        let keypoints = vec![
            Keypoint::new(BodyPart::LeftWrist, 1.0, 1.0, 0.1),
            Keypoint::new(BodyPart::LeftWrist, 2.0, 2.0, 0.8),
            Keypoint::new(BodyPart::RightWrist, 3.0, 3.0, 0.05),
        ];

        // Score equal to the threshold does not qualify
        let left = find_part(&keypoints, BodyPart::LeftWrist, 0.1).unwrap();
        assert_eq!(left.position, Position::new(2.0, 2.0));

        assert!(find_part(&keypoints, BodyPart::RightWrist, 0.1).is_none());
        assert!(find_part(&keypoints, BodyPart::Nose, 0.0).is_none());
    }

    #[test]
    fn test_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < f32::EPSILON);
    }
}
