//! Pose Drag - gesture gateway library
//!
//! Turns per-frame wrist keypoints from a pose estimator into drag events
//! for a gesture-controlled game.

pub mod config;
pub mod dispatcher;
pub mod game;
pub mod pose;
pub mod render;
pub mod session;
pub mod tracker;

pub use config::AppConfig;
pub use dispatcher::{PersonDragger, PoseDragger, VALUE_UPDATE};
pub use session::Session;
pub use tracker::{GestureEvent, GestureTracker, Side, TrackedPair};
