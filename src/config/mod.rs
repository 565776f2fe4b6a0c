//! Configuration management for Pose Drag
//!
//! Handles loading, parsing, validation and hot-reloading of YAML configuration files.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

pub use watcher::{ConfigUpdate, ConfigWatcher};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub algorithm: Algorithm,
    pub single_pose: SinglePoseConfig,
    pub multi_pose: MultiPoseConfig,
    pub video: VideoConfig,
    pub tracking: TrackingConfig,
    pub output: OutputConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::SinglePose,
            single_pose: SinglePoseConfig::default(),
            multi_pose: MultiPoseConfig::default(),
            video: VideoConfig::default(),
            tracking: TrackingConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Pose detection algorithm the estimator runs
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    SinglePose,
    MultiPose,
}

/// Thresholds for single-person detection
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SinglePoseConfig {
    pub min_pose_confidence: f32,
    pub min_part_confidence: f32,
}

impl Default for SinglePoseConfig {
    fn default() -> Self {
        Self {
            min_pose_confidence: 0.5,
            min_part_confidence: 0.1,
        }
    }
}

/// Thresholds for multi-person detection
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MultiPoseConfig {
    pub max_pose_detections: usize,
    pub min_pose_confidence: f32,
    pub min_part_confidence: f32,
    /// Non-maximum suppression radius, consumed by the estimator
    pub nms_radius: f32,
}

impl Default for MultiPoseConfig {
    fn default() -> Self {
        Self {
            max_pose_detections: 5,
            min_pose_confidence: 0.15,
            min_part_confidence: 0.1,
            nms_radius: 30.0,
        }
    }
}

/// Video frame geometry
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

/// Which hand drives the game
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HandSelection {
    Left,
    Right,
    Both,
}

/// Gesture tracking parameters
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TrackingConfig {
    pub hand: HandSelection,
    /// Screen-centering offset added to emitted x
    pub x_offset: f32,
    /// Screen-centering offset added to emitted y
    pub y_offset: f32,
    /// Emitted events before the drawing surface is cleared
    pub refresh_after: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_gate: Option<DistanceGate>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            hand: HandSelection::Right,
            x_offset: 0.0,
            y_offset: 0.0,
            refresh_after: 2,
            distance_gate: None,
        }
    }
}

/// Accept a movement only if its length lies strictly between the bounds
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DistanceGate {
    #[serde(default)]
    pub min_distance: f32,
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
}

impl DistanceGate {
    pub fn accepts(&self, distance: f32) -> bool {
        distance > self.min_distance && distance < self.max_distance
    }
}

/// Overlay drawing switches
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub show_video: bool,
    pub show_skeleton: bool,
    pub show_points: bool,
    pub show_bounding_box: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            show_video: false,
            show_skeleton: true,
            show_points: true,
            show_bounding_box: false,
        }
    }
}

/// Configuration values that parse but make no sense
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be within [0, 1], got {value}")]
    ConfidenceOutOfRange { field: &'static str, value: f32 },

    #[error("tracking.refresh_after must be greater than zero")]
    ZeroRefresh,

    #[error("distance gate min ({min}) must be below max ({max})")]
    InvalidDistanceGate { min: f32, max: f32 },

    #[error("video dimensions must be non-zero, got {width}x{height}")]
    EmptyVideo { width: u32, height: u32 },
}

impl AppConfig {
    /// Load configuration from file
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_yaml(&contents).with_context(|| format!("Invalid config file: {}", path))
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        let confidences = [
            ("single_pose.min_pose_confidence", self.single_pose.min_pose_confidence),
            ("single_pose.min_part_confidence", self.single_pose.min_part_confidence),
            ("multi_pose.min_pose_confidence", self.multi_pose.min_pose_confidence),
            ("multi_pose.min_part_confidence", self.multi_pose.min_part_confidence),
        ];
        for (field, value) in confidences {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ConfidenceOutOfRange { field, value });
            }
        }

        if self.tracking.refresh_after == 0 {
            return Err(ConfigError::ZeroRefresh);
        }

        if let Some(gate) = &self.tracking.distance_gate {
            if gate.min_distance >= gate.max_distance {
                return Err(ConfigError::InvalidDistanceGate {
                    min: gate.min_distance,
                    max: gate.max_distance,
                });
            }
        }

        if self.video.width == 0 || self.video.height == 0 {
            return Err(ConfigError::EmptyVideo {
                width: self.video.width,
                height: self.video.height,
            });
        }

        Ok(())
    }

    /// Minimum pose score for the active algorithm
    pub fn min_pose_confidence(&self) -> f32 {
        match self.algorithm {
            Algorithm::SinglePose => self.single_pose.min_pose_confidence,
            Algorithm::MultiPose => self.multi_pose.min_pose_confidence,
        }
    }

    /// Minimum keypoint score for the active algorithm
    pub fn min_part_confidence(&self) -> f32 {
        match self.algorithm {
            Algorithm::SinglePose => self.single_pose.min_part_confidence,
            Algorithm::MultiPose => self.multi_pose.min_part_confidence,
        }
    }

    /// How many poses of one frame feed the tracker
    pub fn max_poses(&self) -> usize {
        match self.algorithm {
            Algorithm::SinglePose => 1,
            Algorithm::MultiPose => self.multi_pose.max_pose_detections,
        }
    }

    /// Top-level sections that differ from `previous`
    pub fn changed_sections(&self, previous: &AppConfig) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.algorithm != previous.algorithm
            || self.single_pose != previous.single_pose
            || self.multi_pose != previous.multi_pose
        {
            changed.push("detection");
        }
        if self.video != previous.video {
            changed.push("video");
        }
        if self.tracking != previous.tracking {
            changed.push("tracking");
        }
        if self.output != previous.output {
            changed.push("output");
        }
        changed
    }
}

// Default value functions
fn default_max_distance() -> f32 { 300.0 }
