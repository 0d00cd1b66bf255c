//! Picks up edits to the settings file while the daemon runs.

use log::{debug, info};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use wlankeep::{ConfigPublisher, TargetConfig};

use crate::config;

/// How often the settings file is checked for changes.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(2);

/// Tracks the settings file's modification time.
#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    last_seen: Option<SystemTime>,
}

impl ConfigWatcher {
    /// Starts watching `path`, treating its current state as already seen.
    pub fn new(path: PathBuf) -> Self {
        let last_seen = modified(&path);
        Self { path, last_seen }
    }

    /// Returns the reloaded settings if the file changed since the last
    /// check. A deleted file reloads as defaults.
    pub fn poll(&mut self) -> Option<TargetConfig> {
        let current = modified(&self.path);
        if current == self.last_seen {
            return None;
        }
        self.last_seen = current;
        debug!("{} changed", self.path.display());
        Some(config::load(&self.path))
    }
}

fn modified(path: &std::path::Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Spawns a task publishing every settings change to `publisher`.
pub fn spawn(mut watcher: ConfigWatcher, publisher: ConfigPublisher) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(CHECK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Some(config) = watcher.poll()
                && config != publisher.current()
            {
                info!(
                    "Settings changed: network={:?} adapter={:?} interval={}s",
                    config.selected_network, config.selected_adapter, config.poll_interval
                );
                publisher.publish(config);
            }
        }
    })
}
