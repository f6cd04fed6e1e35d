//! Configuration file watcher for hot reload.
//!
//! # Responsibilities
//! - Turn file-system events into validated [`FrontendConfig`] updates
//! - Coalesce the burst of events a single save produces into one reload
//! - Forward only changes a running server can apply
//!
//! # Design Decisions
//! - Listener and TLS settings are pinned to the values the server started
//!   with; a save that only touches them is logged and dropped
//! - An invalid file is never forwarded, the previous config stays live

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::FrontendConfig;

/// Quiet period after the last file event before the file is re-read.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// What a freshly loaded file means for the running server.
#[derive(Debug, Clone, PartialEq)]
pub enum ReloadAction {
    /// Same settings as the live config.
    Unchanged,
    /// Only listener settings differ; they need a restart.
    ListenerOnly,
    /// Forward this config. Its listener section is the live one.
    Apply(FrontendConfig),
}

/// Decide how to treat `loaded` given the config currently in effect.
pub fn reload_action(live: &FrontendConfig, mut loaded: FrontendConfig) -> ReloadAction {
    let listener_changed = loaded.listener != live.listener;
    loaded.listener = live.listener.clone();

    if loaded == *live {
        if listener_changed {
            ReloadAction::ListenerOnly
        } else {
            ReloadAction::Unchanged
        }
    } else {
        if listener_changed {
            tracing::warn!("Listener changes require a restart and were not applied");
        }
        ReloadAction::Apply(loaded)
    }
}

/// Watches one configuration file and pushes applicable updates.
pub struct ConfigWatcher {
    path: PathBuf,
    live: FrontendConfig,
    debounce: Duration,
    update_tx: mpsc::UnboundedSender<FrontendConfig>,
}

impl ConfigWatcher {
    /// Create a watcher for `path`, starting from the config already in
    /// effect.
    ///
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path, live: FrontendConfig) -> (Self, mpsc::UnboundedReceiver<FrontendConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                live,
                debounce: DEFAULT_DEBOUNCE,
                update_tx,
            },
            update_rx,
        )
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start watching. Must be called inside a tokio runtime.
    ///
    /// The returned watcher must be kept alive for updates to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let _ = event_tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?self.path, debounce = ?self.debounce, "Config watcher started");

        tokio::spawn(self.reload_loop(event_rx));
        Ok(watcher)
    }

    async fn reload_loop(mut self, mut events: mpsc::UnboundedReceiver<()>) {
        while events.recv().await.is_some() {
            let mut coalesced = 1u32;
            while let Ok(Some(())) = tokio::time::timeout(self.debounce, events.recv()).await {
                coalesced += 1;
            }

            tracing::debug!(events = coalesced, "Config file settled");
            if !self.reload() {
                break;
            }
        }
        tracing::debug!(path = ?self.path, "Config watcher stopped");
    }

    /// Re-read the file once. Returns `false` when nobody is listening any
    /// more.
    fn reload(&mut self) -> bool {
        let loaded = match load_config(&self.path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                return true;
            }
        };

        match reload_action(&self.live, loaded) {
            ReloadAction::Unchanged => {
                tracing::debug!(path = ?self.path, "Config file saved without changes");
                true
            }
            ReloadAction::ListenerOnly => {
                tracing::warn!(path = ?self.path, "Only listener settings changed; restart to apply them");
                true
            }
            ReloadAction::Apply(config) => {
                tracing::info!(path = ?self.path, "Config file changed, forwarding update");
                self.live = config.clone();
                self.update_tx.send(config).is_ok()
            }
        }
    }
}
