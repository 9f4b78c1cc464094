//! Configuration file watcher for hot reload.
//!
//! A reload only reaches subscribers once the file parses, validates and
//! compiles into a [`Router`]. Anything else keeps the current router.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::routing::Router;

/// Watches the route file and emits freshly built routers.
pub struct RouterWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<Arc<Router>>,
}

impl RouterWatcher {
    /// Returns the watcher and a receiver for rebuilt routers.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<Arc<Router>>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. Watching stops when the returned handle drops.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    tracing::info!(path = ?path, "Route file change detected, reloading");
                    if let Some(router) = rebuild(&path) {
                        let _ = tx.send(Arc::new(router));
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Route watcher started");
        Ok(watcher)
    }
}

fn rebuild(path: &Path) -> Option<Router> {
    let config = match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload routes, keeping current router");
            return None;
        }
    };
    match Router::from_config(&config) {
        Ok(router) => Some(router),
        Err(e) => {
            tracing::error!(error = %e, "Reloaded routes rejected, keeping current router");
            None
        }
    }
}
