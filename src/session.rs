//! Per-frame session loop
//!
//! A [`Session`] owns everything that persists between frames: the gesture
//! tracker, the person dragger games subscribe to, and the drawing surfaces.
//! The host hands it one frame per tick; ticks never overlap, so no state
//! here is shared or locked.

use chrono::{DateTime, Local};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{AppConfig, ConfigError};
use crate::dispatcher::{PersonDragger, VALUE_UPDATE};
use crate::game::GameModule;
use crate::pose::{Frame, Pose};
use crate::render::{Surface, KEYPOINT_RADIUS, MINI_SCALE, TRACKED_RADIUS};
use crate::tracker::{GestureEvent, GestureTracker, Side};

/// Running totals for a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    pub frames: u64,
    /// Poses that cleared the pose confidence threshold
    pub poses: u64,
    pub events: u64,
    /// Events that reached a registered handler
    pub delivered: u64,
    pub refreshes: u64,
    pub last_action: Option<DateTime<Local>>,
}

/// What a single tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub poses: usize,
    pub events: Vec<GestureEvent>,
    pub cleared: bool,
}

pub struct Session {
    config: AppConfig,
    tracker: GestureTracker,
    dragger: PersonDragger,
    games: Vec<Arc<dyn GameModule>>,
    surface: Box<dyn Surface>,
    mini: Box<dyn Surface>,
    stats: SessionStats,
}

impl Session {
    /// Create a session drawing onto `surface`, with `mini` as the small preview
    pub fn new(config: AppConfig, surface: Box<dyn Surface>, mini: Box<dyn Surface>) -> Self {
        let tracker = GestureTracker::new(config.tracking.clone());
        Self {
            config,
            tracker,
            dragger: PersonDragger::new(),
            games: Vec::new(),
            surface,
            mini,
            stats: SessionStats::default(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn tracker(&self) -> &GestureTracker {
        &self.tracker
    }

    pub fn dragger(&self) -> &PersonDragger {
        &self.dragger
    }

    pub fn dragger_mut(&mut self) -> &mut PersonDragger {
        &mut self.dragger
    }

    /// Subscribe `game` to drag steps of every side the hand selection includes
    ///
    /// The game stays attached to the session and follows later hand changes.
    pub fn install_game(&mut self, game: Arc<dyn GameModule>) {
        self.subscribe(game.as_ref());
        self.games.push(game);
    }

    fn subscribe(&mut self, game: &dyn GameModule) {
        for side in Side::ALL {
            if self.config.tracking.hand.includes(side) {
                game.install_pose_dragger(self.dragger.side_mut(side));
                info!("Game '{}' follows the {} hand", game.name(), side);
            }
        }
    }

    /// Replace the configuration, keeping gesture state
    ///
    /// A new hand selection moves the installed games to the newly selected sides.
    pub fn apply_config(&mut self, config: AppConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let hand_changed = config.tracking.hand != self.config.tracking.hand;
        self.tracker.set_config(config.tracking.clone());
        self.config = config;

        if hand_changed {
            for side in Side::ALL {
                self.dragger.side_mut(side).off(VALUE_UPDATE);
            }
            let games = self.games.clone();
            for game in &games {
                self.subscribe(game.as_ref());
            }
        }
        Ok(())
    }

    /// Forget gesture state and wipe the drawing surface
    pub fn clear(&mut self) {
        self.tracker.reset();
        self.surface.clear();
        info!("Session cleared");
    }

    /// Run one frame
    pub fn tick(&mut self, frame: &Frame) -> TickReport {
        self.stats.frames += 1;
        let mut report = TickReport::default();

        let min_pose = self.config.min_pose_confidence();
        let max_poses = self.config.max_poses();

        for pose in frame.poses.iter().take(max_poses) {
            if pose.score < min_pose {
                debug!("Skipping pose with score {:.2} < {:.2}", pose.score, min_pose);
                continue;
            }
            report.poses += 1;
            self.stats.poses += 1;
            self.process_pose(pose, &mut report);
        }

        report
    }

    fn process_pose(&mut self, pose: &Pose, report: &mut TickReport) {
        let min_part = self.config.min_part_confidence();
        let keypoints = &pose.keypoints;

        self.mini.clear();
        self.mini.draw_keypoints(keypoints, min_part, MINI_SCALE, KEYPOINT_RADIUS);
        self.mini.draw_skeleton(keypoints, min_part, MINI_SCALE);

        if self.config.output.show_points {
            let outcome = self.tracker.track(keypoints, min_part);

            if outcome.clear_surface {
                self.surface.clear();
                self.stats.refreshes += 1;
                report.cleared = true;
            }

            if !outcome.overlay.is_empty() {
                self.surface
                    .draw_keypoints(&outcome.overlay, min_part, 1.0, TRACKED_RADIUS);
            }

            for (event, segment) in outcome.events.iter().zip(&outcome.segments) {
                if self.dragger.dispatch(event) {
                    self.stats.delivered += 1;
                }
                self.surface
                    .draw_segment(segment.from, segment.to, segment.side.trail_color(), 1.0);
            }

            if !outcome.events.is_empty() {
                self.stats.events += outcome.events.len() as u64;
                self.stats.last_action = Some(Local::now());
            }
            report.events.extend(outcome.events);
        }

        if self.config.output.show_skeleton {
            self.surface.draw_skeleton(keypoints, min_part, 1.0);
        }
        if self.config.output.show_bounding_box {
            self.surface.draw_bounding_box(keypoints);
        }
    }
}
