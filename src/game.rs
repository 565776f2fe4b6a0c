//! Game modules - consumers of drag events
//!
//! A game subscribes to a side's [`PoseDragger`] and moves its objects when
//! drag steps arrive. The real game lives outside this crate;
//! [`ConsoleGame`] stands in for it and logs what it receives.

use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::dispatcher::PoseDragger;
use crate::tracker::GestureEvent;

/// Game module trait - anything that consumes drag steps implements this
pub trait GameModule: Send + Sync {
    /// Module name for logs
    fn name(&self) -> &str;

    /// Prepare the game before any events arrive
    ///
    /// Default implementation: nothing to prepare
    fn start(&self) -> Result<()> {
        Ok(())
    }

    /// Subscribe to drag steps on `dragger`
    fn install_pose_dragger(&self, dragger: &mut PoseDragger);
}

/// ConsoleGame logs every drag step it receives
///
/// Useful for running the gateway without a game attached and for checking
/// which side drives the game.
pub struct ConsoleGame {
    name: String,
    /// Received drag steps
    received: Arc<AtomicU64>,
}

impl ConsoleGame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            received: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

impl GameModule for ConsoleGame {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<()> {
        info!("🎮 Game '{}' started", self.name);
        Ok(())
    }

    fn install_pose_dragger(&self, dragger: &mut PoseDragger) {
        let name = self.name.clone();
        let received = self.received.clone();

        dragger.on_value_update(move |event: &GestureEvent| {
            let count = received.fetch_add(1, Ordering::Relaxed) + 1;
            info!(
                "🎮 [{}] Game '{}' ← {} drag ({:+.1}, {:+.1}) at ({:.1}, {:.1}) [#{}]",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                name,
                event.side,
                event.dx,
                event.dy,
                event.x,
                event.y,
                count
            );
            debug!(
                game = name.as_str(),
                side = event.side.as_str(),
                dx = event.dx,
                dy = event.dy,
                "ConsoleGame drag"
            );
        });

        info!("Game '{}' installed on pose dragger", self.name);
    }
}
