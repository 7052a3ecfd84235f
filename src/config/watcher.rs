//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself: editors that
//! save by writing a temporary file and renaming it over the original would
//! otherwise detach the watch after the first save.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatekeeperConfig;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    current: GatekeeperConfig,
    update_tx: mpsc::UnboundedSender<GatekeeperConfig>,
}

impl ConfigWatcher {
    /// Create a watcher for `path`, starting from the running `current` config.
    ///
    /// Returns the watcher and a receiver for validated configuration updates.
    /// Saves that leave the configuration unchanged are not forwarded.
    pub fn new(path: &Path, current: GatekeeperConfig) -> (Self, mpsc::UnboundedReceiver<GatekeeperConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            current,
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            mut current,
            update_tx,
        } = self;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let watched = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if concerns(&event, &watched) => {
                    let new_config = match load_config(&watched) {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::error!(path = ?watched, error = %e, "Config reload rejected, keeping current configuration");
                            return;
                        }
                    };
                    if new_config == current {
                        tracing::debug!(path = ?watched, "Config file saved without changes");
                        return;
                    }

                    let pending = restart_required(&current, &new_config);
                    if !pending.is_empty() {
                        tracing::warn!(sections = ?pending, "Config changes that only apply after a restart");
                    }
                    tracing::info!(path = ?watched, "Config change detected, applying gate rules");
                    if update_tx.send(new_config.clone()).is_err() {
                        tracing::debug!("Config receiver dropped, ignoring update");
                    }
                    current = new_config;
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

/// Whether `event` writes or replaces the watched file.
fn concerns(event: &Event, file: &Path) -> bool {
    let Some(name) = file.file_name() else {
        return false;
    };
    (event.kind.is_modify() || event.kind.is_create())
        && event.paths.iter().any(|p| p.file_name() == Some(name))
}

/// Changed settings the running process cannot apply in place.
///
/// Route patterns, the sign-in target and the lookup timeout are swapped
/// live; everything else is bound at startup.
pub fn restart_required(old: &GatekeeperConfig, new: &GatekeeperConfig) -> Vec<&'static str> {
    let mut pending = Vec::new();
    if old.listener != new.listener {
        pending.push("listener");
    }
    if old.upstream != new.upstream {
        pending.push("upstream");
    }
    if old.timeouts != new.timeouts {
        pending.push("timeouts");
    }
    if old.observability != new.observability {
        pending.push("observability");
    }
    if old.admin != new.admin {
        pending.push("admin");
    }
    if old.auth.provider_url != new.auth.provider_url || old.auth.provider_secret != new.auth.provider_secret {
        pending.push("auth.provider");
    }
    if old.auth.session_cookie != new.auth.session_cookie {
        pending.push("auth.session_cookie");
    }
    pending
}
