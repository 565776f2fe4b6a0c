//! Configuration file watcher for hot-reload support
//!
//! File events are coalesced into a single reload task. Each reload is
//! validated and compared with the last accepted config, and only real
//! changes are forwarded, tagged with the sections they touch.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::AppConfig;

/// Wait after the first modify event so editors finish writing
const DEBOUNCE: Duration = Duration::from_millis(100);

/// A validated config that differs from the previous one
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigUpdate {
    pub config: AppConfig,
    /// Sections that changed (e.g., "tracking", "output")
    pub changed: Vec<&'static str>,
}

impl ConfigUpdate {
    pub fn touches(&self, section: &str) -> bool {
        self.changed.iter().any(|s| *s == section)
    }
}

/// Config watcher that monitors file changes and sends reload notifications
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<ConfigUpdate>,
}

impl ConfigWatcher {
    /// Load `config_path` and start watching it
    ///
    /// Returns the watcher together with the initial configuration.
    pub async fn new(config_path: String) -> Result<(Self, AppConfig)> {
        let initial = AppConfig::load(&config_path)
            .await
            .context("Failed to load initial config")?;

        // Capacity 1: a pending touch already covers any later ones
        let (touch_tx, touch_rx) = mpsc::channel::<()>(1);
        let (update_tx, rx) = mpsc::channel(10);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) if matches!(event.kind, EventKind::Modify(_)) => {
                    debug!("Config file modified: {:?}", event.paths);
                    let _ = touch_tx.try_send(());
                }
                Ok(_) => {}
                Err(e) => error!("Watch error: {}", e),
            }
        })?;

        watcher
            .watch(Path::new(&config_path), RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config file: {}", config_path))?;

        tokio::spawn(reload_loop(config_path.clone(), initial.clone(), touch_rx, update_tx));

        info!("Config file watcher started for: {}", config_path);

        Ok((Self { _watcher: watcher, rx }, initial))
    }

    /// Wait for the next config change
    /// Returns None if the watcher has been closed
    pub async fn next_update(&mut self) -> Option<ConfigUpdate> {
        self.rx.recv().await
    }
}

/// Reload `path` and diff it against `current`
///
/// Returns `Ok(None)` when the file parses to the same configuration.
pub async fn reload(path: &str, current: &AppConfig) -> Result<Option<ConfigUpdate>> {
    let config = AppConfig::load(path).await?;
    let changed = config.changed_sections(current);
    if changed.is_empty() {
        return Ok(None);
    }
    Ok(Some(ConfigUpdate { config, changed }))
}

async fn reload_loop(
    path: String,
    mut current: AppConfig,
    mut touch_rx: mpsc::Receiver<()>,
    update_tx: mpsc::Sender<ConfigUpdate>,
) {
    while touch_rx.recv().await.is_some() {
        tokio::time::sleep(DEBOUNCE).await;
        // Touches that arrived while debouncing are covered by this reload
        while touch_rx.try_recv().is_ok() {}

        match reload(&path, &current).await {
            Ok(Some(update)) => {
                info!("Configuration changed: {}", update.changed.join(", "));
                current = update.config.clone();
                if update_tx.send(update).await.is_err() {
                    break;
                }
            }
            Ok(None) => debug!("Config file touched without changes"),
            Err(e) => warn!("Failed to reload config (keeping old config): {:#}", e),
        }
    }
    debug!("Config reload task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HandSelection;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reload_reports_changed_sections() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("pose-drag.yaml");
        let path_str = path.to_string_lossy().to_string();

        let current = AppConfig::default();
        fs::write(&path, "tracking:\n  hand: right\n")?;
        assert_eq!(reload(&path_str, &current).await?, None);

        fs::write(&path, "tracking:\n  hand: left\noutput:\n  show_skeleton: false\n")?;
        let update = reload(&path_str, &current).await?.expect("config changed");
        assert_eq!(update.changed, vec!["tracking", "output"]);
        assert!(update.touches("tracking"));
        assert!(!update.touches("video"));
        assert_eq!(update.config.tracking.hand, HandSelection::Left);

        // Invalid edits are rejected rather than forwarded
        fs::write(&path, "tracking:\n  refresh_after: 0\n")?;
        assert!(reload(&path_str, &current).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_config_watcher_reloads_tracking() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("test-config.yaml");

        fs::write(&config_path, "tracking:\n  hand: right\n")?;

        let (mut watcher, config) =
            ConfigWatcher::new(config_path.to_string_lossy().to_string()).await?;
        assert_eq!(config.tracking.hand, HandSelection::Right);

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&config_path, "tracking:\n  hand: left\n  x_offset: 12\n")?;

        let update = tokio::time::timeout(Duration::from_secs(2), watcher.next_update())
            .await?
            .expect("watcher channel closed");

        assert_eq!(update.changed, vec!["tracking"]);
        assert_eq!(update.config.tracking.hand, HandSelection::Left);
        assert_eq!(update.config.tracking.x_offset, 12.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_initial_config_fails() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("bad.yaml");
        fs::write(&config_path, "tracking:\n  refresh_after: 0\n")?;

        let result = ConfigWatcher::new(config_path.to_string_lossy().to_string()).await;
        assert!(result.is_err());
        Ok(())
    }
}
