//! Overlay drawing surfaces
//!
//! The session only ever pushes keypoints into a [`Surface`]; nothing drawn
//! flows back into tracking state.

use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

use crate::pose::{find_part, Keypoint, Position, SKELETON};

/// Scale of the mini preview relative to the video frame
pub const MINI_SCALE: f32 = 0.25;

/// Default keypoint dot radius
pub const KEYPOINT_RADIUS: f32 = 3.0;

/// Dot radius for the tracked wrists
pub const TRACKED_RADIUS: f32 = 10.0;

/// Something the overlay can be drawn on
pub trait Surface: Send {
    /// Wipe everything drawn so far
    fn clear(&mut self);

    fn draw_keypoints(&mut self, keypoints: &[Keypoint], min_confidence: f32, scale: f32, radius: f32);

    fn draw_segment(&mut self, from: Position, to: Position, color: &str, scale: f32);

    fn draw_skeleton(&mut self, keypoints: &[Keypoint], min_confidence: f32, scale: f32);

    fn draw_bounding_box(&mut self, keypoints: &[Keypoint]);
}

/// Connected keypoint pairs where both ends clear `min_confidence`
pub fn adjacent_keypoints(keypoints: &[Keypoint], min_confidence: f32) -> Vec<(Keypoint, Keypoint)> {
    SKELETON
        .iter()
        .filter_map(|&(a, b)| {
            Some((
                find_part(keypoints, a, min_confidence)?,
                find_part(keypoints, b, min_confidence)?,
            ))
        })
        .collect()
}

/// Smallest axis-aligned box containing every keypoint, as (min, max)
pub fn bounding_box(keypoints: &[Keypoint]) -> Option<(Position, Position)> {
    let first = keypoints.first()?.position;
    Some(keypoints.iter().skip(1).fold((first, first), |(min, max), kp| {
        (
            Position::new(min.x.min(kp.position.x), min.y.min(kp.position.y)),
            Position::new(max.x.max(kp.position.x), max.y.max(kp.position.y)),
        )
    }))
}

/// Surface that logs every draw call
#[derive(Debug)]
pub struct ConsoleSurface {
    name: String,
    draw_count: u64,
}

impl ConsoleSurface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            draw_count: 0,
        }
    }

    /// Draw calls since the last clear
    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }
}

impl Surface for ConsoleSurface {
    fn clear(&mut self) {
        debug!("🧽 [{}] clear ({} draws)", self.name, self.draw_count);
        self.draw_count = 0;
    }

    fn draw_keypoints(&mut self, keypoints: &[Keypoint], min_confidence: f32, scale: f32, radius: f32) {
        self.draw_count += 1;
        for kp in keypoints.iter().filter(|kp| kp.score >= min_confidence) {
            trace!(
                "[{}] dot {} at ({:.1}, {:.1}) r={}",
                self.name,
                kp.part,
                kp.position.x * scale,
                kp.position.y * scale,
                radius
            );
        }
    }

    fn draw_segment(&mut self, from: Position, to: Position, color: &str, scale: f32) {
        self.draw_count += 1;
        debug!(
            "✏️  [{}] {} line ({:.1}, {:.1}) → ({:.1}, {:.1})",
            self.name,
            color,
            from.x * scale,
            from.y * scale,
            to.x * scale,
            to.y * scale
        );
    }

    fn draw_skeleton(&mut self, keypoints: &[Keypoint], min_confidence: f32, _scale: f32) {
        self.draw_count += 1;
        let bones = adjacent_keypoints(keypoints, min_confidence);
        trace!("[{}] skeleton with {} bones", self.name, bones.len());
    }

    fn draw_bounding_box(&mut self, keypoints: &[Keypoint]) {
        self.draw_count += 1;
        if let Some((min, max)) = bounding_box(keypoints) {
            trace!(
                "[{}] box ({:.1}, {:.1}) - ({:.1}, {:.1})",
                self.name, min.x, min.y, max.x, max.y
            );
        }
    }
}

/// A draw call captured by [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Clear,
    Keypoints { keypoints: Vec<Keypoint>, scale: f32, radius: f32 },
    Segment { from: Position, to: Position, color: String },
    Skeleton { bones: usize, scale: f32 },
    BoundingBox(Option<(Position, Position)>),
}

/// Surface that records draw calls; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    calls: Arc<Mutex<Vec<DrawCall>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<DrawCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn take(&self) -> Vec<DrawCall> {
        self.calls
            .lock()
            .map(|mut c| std::mem::take(&mut *c))
            .unwrap_or_default()
    }

    fn push(&self, call: DrawCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self) {
        self.push(DrawCall::Clear);
    }

    fn draw_keypoints(&mut self, keypoints: &[Keypoint], min_confidence: f32, scale: f32, radius: f32) {
        self.push(DrawCall::Keypoints {
            keypoints: keypoints
                .iter()
                .filter(|kp| kp.score >= min_confidence)
                .copied()
                .collect(),
            scale,
            radius,
        });
    }

    fn draw_segment(&mut self, from: Position, to: Position, color: &str, _scale: f32) {
        self.push(DrawCall::Segment {
            from,
            to,
            color: color.to_string(),
        });
    }

    fn draw_skeleton(&mut self, keypoints: &[Keypoint], min_confidence: f32, scale: f32) {
        self.push(DrawCall::Skeleton {
            bones: adjacent_keypoints(keypoints, min_confidence).len(),
            scale,
        });
    }

    fn draw_bounding_box(&mut self, keypoints: &[Keypoint]) {
        self.push(DrawCall::BoundingBox(bounding_box(keypoints)));
    }
}
