//! Gesture tracker - turns wrist movement into drag deltas
//!
//! The tracker keeps the last qualifying wrist keypoint per side and, each
//! frame, compares the current wrists against it. Every accepted movement
//! becomes a [`GestureEvent`] and rolls the baseline forward to the current
//! keypoint.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::{HandSelection, TrackingConfig};
use crate::pose::{find_part, BodyPart, Keypoint, Position};

/// Tracked limb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Wrist keypoint that drives this side
    pub fn wrist(&self) -> BodyPart {
        match self {
            Self::Left => BodyPart::LeftWrist,
            Self::Right => BodyPart::RightWrist,
        }
    }

    /// Signed movement between two observations
    ///
    /// The two sides mirror each other: the left side reports
    /// `current - last`, the right side reports `last - current`.
    pub fn delta(&self, last: Position, current: Position) -> (f32, f32) {
        match self {
            Self::Left => (current.x - last.x, current.y - last.y),
            Self::Right => (last.x - current.x, last.y - current.y),
        }
    }

    /// Position reported as the absolute drag point, before offsets
    ///
    /// The left side reports where the wrist is now, the right side where it was.
    pub fn anchor(&self, last: Position, current: Position) -> Position {
        match self {
            Self::Left => current,
            Self::Right => last,
        }
    }

    /// Trail colour used by the overlay
    pub fn trail_color(&self) -> &'static str {
        match self {
            Self::Left => "black",
            Self::Right => "DeepPink",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HandSelection {
    pub fn includes(&self, side: Side) -> bool {
        matches!(
            (self, side),
            (HandSelection::Both, _)
                | (HandSelection::Left, Side::Left)
                | (HandSelection::Right, Side::Right)
        )
    }
}

/// Most recent qualifying wrist per side
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackedPair {
    pub left: Option<Keypoint>,
    pub right: Option<Keypoint>,
}

impl TrackedPair {
    /// Select the wrists scoring strictly above `min_part_confidence`
    pub fn from_keypoints(keypoints: &[Keypoint], min_part_confidence: f32) -> Self {
        Self {
            left: find_part(keypoints, BodyPart::LeftWrist, min_part_confidence),
            right: find_part(keypoints, BodyPart::RightWrist, min_part_confidence),
        }
    }

    pub fn get(&self, side: Side) -> Option<Keypoint> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn set(&mut self, side: Side, keypoint: Keypoint) {
        match side {
            Side::Left => self.left = Some(keypoint),
            Side::Right => self.right = Some(keypoint),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Present keypoints, left first
    pub fn present(&self) -> Vec<Keypoint> {
        self.left.into_iter().chain(self.right).collect()
    }
}

/// One drag step for one side
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GestureEvent {
    pub dx: f32,
    pub dy: f32,
    pub x: f32,
    pub y: f32,
    pub side: Side,
}

impl GestureEvent {
    /// Positional argument list handed to game subscribers:
    /// `[dx, dy, x, y, null, side]`
    pub fn to_args(&self) -> Vec<Value> {
        vec![
            Value::from(self.dx),
            Value::from(self.dy),
            Value::from(self.x),
            Value::from(self.y),
            Value::Null,
            Value::from(self.side.as_str()),
        ]
    }

    /// Inverse of [`GestureEvent::to_args`]
    pub fn from_args(args: &[Value]) -> Option<Self> {
        let number = |i: usize| args.get(i).and_then(Value::as_f64).map(|v| v as f32);
        let side = match args.get(5).and_then(Value::as_str)? {
            "left" => Side::Left,
            "right" => Side::Right,
            _ => return None,
        };
        Some(Self {
            dx: number(0)?,
            dy: number(1)?,
            x: number(2)?,
            y: number(3)?,
            side,
        })
    }
}

/// Line from a side's previous wrist position to its current one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailSegment {
    pub side: Side,
    pub from: Position,
    pub to: Position,
}

/// What one frame produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackOutcome {
    /// The accumulated drawing surface should be wiped before drawing
    pub clear_surface: bool,
    /// Wrists involved in this frame's gesture, for overlay drawing
    pub overlay: Vec<Keypoint>,
    pub events: Vec<GestureEvent>,
    pub segments: Vec<TrailSegment>,
}

/// Per-session gesture state
#[derive(Debug, Clone)]
pub struct GestureTracker {
    config: TrackingConfig,
    last_pair: Option<TrackedPair>,
    action_count: u32,
}

impl GestureTracker {
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            config,
            last_pair: None,
            action_count: 0,
        }
    }

    /// Swap tracking parameters, keeping the current baseline
    pub fn set_config(&mut self, config: TrackingConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    pub fn last_pair(&self) -> Option<&TrackedPair> {
        self.last_pair.as_ref()
    }

    /// Events emitted since the last surface refresh
    pub fn action_count(&self) -> u32 {
        self.action_count
    }

    /// Forget the baseline and the refresh counter
    pub fn reset(&mut self) {
        self.last_pair = None;
        self.action_count = 0;
    }

    /// Process one pose's keypoints
    pub fn track(&mut self, keypoints: &[Keypoint], min_part_confidence: f32) -> TrackOutcome {
        let current = TrackedPair::from_keypoints(keypoints, min_part_confidence);
        let mut outcome = TrackOutcome::default();

        if current.is_empty() {
            trace!("No qualifying wrist this frame");
            return outcome;
        }

        let last = match self.last_pair.as_mut() {
            Some(last) => last,
            None => {
                debug!("Gesture baseline initialized: {:?}", current);
                self.last_pair = Some(current);
                return outcome;
            }
        };

        if self.action_count >= self.config.refresh_after {
            debug!("Refreshing surface after {} events", self.action_count);
            outcome.clear_surface = true;
            self.action_count = 0;
        }

        outcome.overlay = current.present();

        for side in Side::ALL {
            if !self.config.hand.includes(side) {
                continue;
            }
            let (Some(prev), Some(cur)) = (last.get(side), current.get(side)) else {
                continue;
            };

            if let Some(gate) = &self.config.distance_gate {
                let distance = prev.position.distance(&cur.position);
                if !gate.accepts(distance) {
                    trace!("{} movement of {:.1}px rejected by distance gate", side, distance);
                    continue;
                }
            }

            let (dx, dy) = side.delta(prev.position, cur.position);
            let anchor = side.anchor(prev.position, cur.position);
            let event = GestureEvent {
                dx,
                dy,
                x: anchor.x + self.config.x_offset,
                y: anchor.y + self.config.y_offset,
                side,
            };
            debug!(
                "Gesture {}: dx={:.1} dy={:.1} x={:.1} y={:.1}",
                side, event.dx, event.dy, event.x, event.y
            );

            outcome.events.push(event);
            outcome.segments.push(TrailSegment {
                side,
                from: prev.position,
                to: cur.position,
            });

            last.set(side, cur);
            self.action_count += 1;
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistanceGate;
    use proptest::prelude::*;

    fn tracking(hand: HandSelection) -> TrackingConfig {
        TrackingConfig {
            hand,
            ..TrackingConfig::default()
        }
    }

    fn wrists(left: Option<(f32, f32)>, right: Option<(f32, f32)>) -> Vec<Keypoint> {
        let mut keypoints = vec![Keypoint::new(BodyPart::Nose, 320.0, 100.0, 0.99)];
        if let Some((x, y)) = left {
            keypoints.push(Keypoint::new(BodyPart::LeftWrist, x, y, 0.9));
        }
        if let Some((x, y)) = right {
            keypoints.push(Keypoint::new(BodyPart::RightWrist, x, y, 0.9));
        }
        keypoints
    }

    #[test]
    fn test_first_frame_only_initializes() {
        let mut tracker = GestureTracker::new(tracking(HandSelection::Both));
        let outcome = tracker.track(&wrists(Some((1.0, 2.0)), Some((3.0, 4.0))), 0.1);

        assert_eq!(outcome, TrackOutcome::default());
        let last = tracker.last_pair().unwrap();
        assert_eq!(last.left.unwrap().position, Position::new(1.0, 2.0));
        assert_eq!(last.right.unwrap().position, Position::new(3.0, 4.0));
        assert_eq!(tracker.action_count(), 0);
    }

    #[test]
    fn test_left_delta_uses_current_minus_last() {
        let mut tracker = GestureTracker::new(tracking(HandSelection::Left));
        tracker.track(&wrists(Some((100.0, 100.0)), None), 0.1);
        let outcome = tracker.track(&wrists(Some((110.0, 95.0)), None), 0.1);

        assert_eq!(
            outcome.events,
            vec![GestureEvent { dx: 10.0, dy: -5.0, x: 110.0, y: 95.0, side: Side::Left }]
        );
        assert_eq!(
            tracker.last_pair().unwrap().left.unwrap().position,
            Position::new(110.0, 95.0)
        );
    }

    #[test]
    fn test_right_delta_uses_last_minus_current() {
        let mut tracker = GestureTracker::new(tracking(HandSelection::Right));
        tracker.track(&wrists(None, Some((200.0, 150.0))), 0.1);
        let outcome = tracker.track(&wrists(None, Some((190.0, 150.0))), 0.1);

        assert_eq!(
            outcome.events,
            vec![GestureEvent { dx: 10.0, dy: 0.0, x: 200.0, y: 150.0, side: Side::Right }]
        );
        assert_eq!(
            outcome.segments,
            vec![TrailSegment {
                side: Side::Right,
                from: Position::new(200.0, 150.0),
                to: Position::new(190.0, 150.0),
            }]
        );
    }

    #[test]
    fn test_offsets_are_added() {
        let mut tracker = GestureTracker::new(TrackingConfig {
            hand: HandSelection::Both,
            x_offset: 100.0,
            y_offset: 50.0,
            ..TrackingConfig::default()
        });
        tracker.track(&wrists(Some((10.0, 10.0)), Some((20.0, 20.0))), 0.1);
        let outcome = tracker.track(&wrists(Some((15.0, 12.0)), Some((25.0, 30.0))), 0.1);

        assert_eq!(outcome.events.len(), 2);
        assert_eq!((outcome.events[0].x, outcome.events[0].y), (115.0, 62.0));
        assert_eq!((outcome.events[1].x, outcome.events[1].y), (120.0, 70.0));
    }

    #[test]
    fn test_unselected_hand_is_ignored() {
        let mut tracker = GestureTracker::new(tracking(HandSelection::Right));
        tracker.track(&wrists(Some((0.0, 0.0)), None), 0.1);
        let outcome = tracker.track(&wrists(Some((5.0, 5.0)), None), 0.1);

        assert!(outcome.events.is_empty());
        assert_eq!(outcome.overlay.len(), 1);
        // Baseline of an unselected side is not rolled forward
        assert_eq!(
            tracker.last_pair().unwrap().left.unwrap().position,
            Position::new(0.0, 0.0)
        );
    }

    #[test]
    fn test_absent_side_keeps_baseline() {
        let mut tracker = GestureTracker::new(tracking(HandSelection::Both));
        tracker.track(&wrists(Some((0.0, 0.0)), Some((50.0, 50.0))), 0.1);

        // Right wrist drops out
        let outcome = tracker.track(&wrists(Some((1.0, 1.0)), None), 0.1);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].side, Side::Left);
        assert_eq!(
            tracker.last_pair().unwrap().right.unwrap().position,
            Position::new(50.0, 50.0)
        );

        // Reappearing wrist jumps against the stale baseline
        let outcome = tracker.track(&wrists(None, Some((10.0, 50.0))), 0.1);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].dx, 40.0);
    }

    #[test]
    fn test_side_without_baseline_emits_nothing() {
        let mut tracker = GestureTracker::new(tracking(HandSelection::Both));
        tracker.track(&wrists(Some((0.0, 0.0)), None), 0.1);

        let outcome = tracker.track(&wrists(Some((1.0, 0.0)), Some((30.0, 30.0))), 0.1);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].side, Side::Left);
        // Right baseline is still not established
        assert!(tracker.last_pair().unwrap().right.is_none());
    }

    #[test]
    fn test_low_confidence_wrist_is_absent() {
        let mut tracker = GestureTracker::new(tracking(HandSelection::Right));
        tracker.track(&wrists(None, Some((0.0, 0.0))), 0.1);

        let weak = vec![Keypoint::new(BodyPart::RightWrist, 40.0, 40.0, 0.1)];
        let outcome = tracker.track(&weak, 0.1);
        assert_eq!(outcome, TrackOutcome::default());
        assert_eq!(
            tracker.last_pair().unwrap().right.unwrap().position,
            Position::new(0.0, 0.0)
        );
    }

    #[test]
    fn test_surface_refresh_after_two_events() {
        let mut tracker = GestureTracker::new(tracking(HandSelection::Right));
        tracker.track(&wrists(None, Some((0.0, 0.0))), 0.1);

        let first = tracker.track(&wrists(None, Some((1.0, 0.0))), 0.1);
        let second = tracker.track(&wrists(None, Some((2.0, 0.0))), 0.1);
        assert!(!first.clear_surface);
        assert!(!second.clear_surface);
        assert_eq!(tracker.action_count(), 2);

        let third = tracker.track(&wrists(None, Some((3.0, 0.0))), 0.1);
        assert!(third.clear_surface);
        // Counter reset, then this frame's event counted
        assert_eq!(tracker.action_count(), 1);
    }

    #[test]
    fn test_refresh_counts_both_sides() {
        let mut tracker = GestureTracker::new(tracking(HandSelection::Both));
        tracker.track(&wrists(Some((0.0, 0.0)), Some((0.0, 0.0))), 0.1);

        let outcome = tracker.track(&wrists(Some((1.0, 1.0)), Some((1.0, 1.0))), 0.1);
        assert!(!outcome.clear_surface);
        assert_eq!(tracker.action_count(), 2);

        // A frame with no qualifying wrist does not consume the refresh
        let outcome = tracker.track(&wrists(None, None), 0.1);
        assert!(!outcome.clear_surface);

        let outcome = tracker.track(&wrists(Some((2.0, 2.0)), None), 0.1);
        assert!(outcome.clear_surface);
    }

    #[test]
    fn test_distance_gate_keeps_baseline() {
        let mut tracker = GestureTracker::new(TrackingConfig {
            hand: HandSelection::Left,
            distance_gate: Some(DistanceGate {
                min_distance: 0.0,
                max_distance: 300.0,
            }),
            ..TrackingConfig::default()
        });
        tracker.track(&wrists(Some((0.0, 0.0)), None), 0.1);

        // No movement: distance 0 is not above the minimum
        assert!(tracker.track(&wrists(Some((0.0, 0.0)), None), 0.1).events.is_empty());
        // Too far
        assert!(tracker.track(&wrists(Some((400.0, 0.0)), None), 0.1).events.is_empty());
        assert_eq!(
            tracker.last_pair().unwrap().left.unwrap().position,
            Position::new(0.0, 0.0)
        );

        let outcome = tracker.track(&wrists(Some((30.0, 40.0)), None), 0.1);
        assert_eq!(outcome.events.len(), 1);
    }

    #[test]
    fn test_reset_forgets_baseline() {
        let mut tracker = GestureTracker::new(tracking(HandSelection::Right));
        tracker.track(&wrists(None, Some((0.0, 0.0))), 0.1);
        tracker.track(&wrists(None, Some((1.0, 0.0))), 0.1);

        tracker.reset();
        assert!(tracker.last_pair().is_none());
        assert_eq!(tracker.action_count(), 0);

        // Next frame initializes again
        let outcome = tracker.track(&wrists(None, Some((9.0, 0.0))), 0.1);
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn test_event_args_order() {
        let event = GestureEvent { dx: 10.0, dy: -5.0, x: 110.0, y: 95.0, side: Side::Left };
        let args = event.to_args();

        assert_eq!(args.len(), 6);
        assert_eq!(args[0], Value::from(10.0f32));
        assert_eq!(args[1], Value::from(-5.0f32));
        assert_eq!(args[4], Value::Null);
        assert_eq!(args[5], Value::from("left"));
        assert_eq!(GestureEvent::from_args(&args), Some(event));
        assert_eq!(GestureEvent::from_args(&args[..4]), None);
    }

    proptest! {
        #[test]
        fn prop_deltas_follow_side_convention(
            lx in -1000.0f32..1000.0, ly in -1000.0f32..1000.0,
            cx in -1000.0f32..1000.0, cy in -1000.0f32..1000.0,
            ox in -500.0f32..500.0, oy in -500.0f32..500.0,
        ) {
            let config = TrackingConfig {
                hand: HandSelection::Both,
                x_offset: ox,
                y_offset: oy,
                ..TrackingConfig::default()
            };
            let mut tracker = GestureTracker::new(config);
            tracker.track(&wrists(Some((lx, ly)), Some((lx, ly))), 0.1);
            let outcome = tracker.track(&wrists(Some((cx, cy)), Some((cx, cy))), 0.1);

            prop_assert_eq!(outcome.events.len(), 2);
            let left = outcome.events[0];
            let right = outcome.events[1];

            prop_assert_eq!(left.dx, cx - lx);
            prop_assert_eq!(left.dy, cy - ly);
            prop_assert_eq!(left.x, cx + ox);
            prop_assert_eq!(left.y, cy + oy);

            prop_assert_eq!(right.dx, lx - cx);
            prop_assert_eq!(right.dy, ly - cy);
            prop_assert_eq!(right.x, lx + ox);
            prop_assert_eq!(right.y, ly + oy);
        }
    }
}
