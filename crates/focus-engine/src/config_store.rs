//! Hot-swappable extension configuration.
//!
//! The store is owned by whoever talks to persistent storage. The engine
//! holds a [`ConfigSubscription`] and drains it at the start of each sample
//! handler, so a swap never lands in the middle of a mutation pass.
//! Elements already focused keep the style they were given; the new config
//! only affects later activation decisions.

use std::path::Path;
use std::sync::Arc;

use gazelens_common::error::{GazelensError, GazelensResult};
use gazelens_page_model::config::{ConfigElement, ExtensionConfig};
use tokio::sync::watch;

/// Shared snapshot of the current config; `None` when there is none.
pub type SharedConfig = Option<Arc<ExtensionConfig>>;

/// Holder of the current config and debug flag.
#[derive(Debug)]
pub struct ConfigStore {
    config_tx: watch::Sender<SharedConfig>,
    debug_tx: watch::Sender<bool>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ConfigStore {
    /// Create a store, optionally seeded with a config. Debug starts off.
    pub fn new(initial: Option<ExtensionConfig>) -> Self {
        let (config_tx, _) = watch::channel(initial.map(Arc::new));
        let (debug_tx, _) = watch::channel(false);
        Self {
            config_tx,
            debug_tx,
        }
    }

    /// Create a store seeded from a JSON config file.
    pub fn load(path: &Path) -> GazelensResult<Self> {
        if !path.exists() {
            return Err(GazelensError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config = ExtensionConfig::from_json(&content)
            .map_err(|e| GazelensError::config(format!("{}: {e}", path.display())))?;
        tracing::debug!(tags = config.len(), path = %path.display(), "Loaded extension config");
        Ok(Self::new(Some(config)))
    }

    /// Current config snapshot.
    pub fn current(&self) -> SharedConfig {
        self.config_tx.borrow().clone()
    }

    /// Swap in a new config.
    pub fn replace(&self, config: ExtensionConfig) {
        tracing::info!(tags = config.len(), "Extension config replaced");
        self.config_tx.send_replace(Some(Arc::new(config)));
    }

    /// Remove the config; styling stops, dwell tracking continues.
    pub fn clear(&self) {
        tracing::info!("Extension config cleared");
        self.config_tx.send_replace(None);
    }

    /// Add or replace the entry for one tag, keeping the rest.
    pub fn upsert_tag(&self, tag: &str, element: ConfigElement) {
        self.config_tx.send_modify(|current| {
            let mut next = current.as_deref().cloned().unwrap_or_default();
            next.insert(tag, element);
            *current = Some(Arc::new(next));
        });
        tracing::info!(tag, "Extension config entry updated");
    }

    /// Toggle debug markers and diagnostic overlays.
    pub fn set_debug(&self, enabled: bool) {
        self.debug_tx.send_if_modified(|current| {
            let changed = *current != enabled;
            *current = enabled;
            changed
        });
    }

    pub fn debug(&self) -> bool {
        *self.debug_tx.borrow()
    }

    /// Register a consumer. The current values count as already seen.
    pub fn subscribe(&self) -> ConfigSubscription {
        ConfigSubscription {
            config: self.config_tx.subscribe(),
            debug: self.debug_tx.subscribe(),
        }
    }
}

/// Changes observed since the last poll.
#[derive(Debug, Clone, Default)]
pub struct SettingsChange {
    /// New config, if it was swapped (`Some(None)` means cleared).
    pub config: Option<SharedConfig>,
    /// New debug flag, if it changed.
    pub debug: Option<bool>,
}

impl SettingsChange {
    pub fn is_empty(&self) -> bool {
        self.config.is_none() && self.debug.is_none()
    }
}

/// The engine's view of a [`ConfigStore`].
#[derive(Debug, Clone)]
pub struct ConfigSubscription {
    config: watch::Receiver<SharedConfig>,
    debug: watch::Receiver<bool>,
}

impl ConfigSubscription {
    /// A subscription with fixed values and no store behind it.
    ///
    /// The store is dropped on return; `poll` reads a closed channel as
    /// unchanged, so the values never change afterwards.
    pub fn fixed(config: Option<ExtensionConfig>, debug: bool) -> Self {
        let store = ConfigStore::new(config);
        store.set_debug(debug);
        store.subscribe()
    }

    pub fn config(&self) -> SharedConfig {
        self.config.borrow().clone()
    }

    pub fn debug(&self) -> bool {
        *self.debug.borrow()
    }

    /// Take any changes published since the last poll.
    ///
    /// A dropped store leaves the last values in place and reports no change.
    pub fn poll(&mut self) -> SettingsChange {
        let mut change = SettingsChange::default();
        if self.config.has_changed().unwrap_or(false) {
            change.config = Some(self.config.borrow_and_update().clone());
        }
        if self.debug.has_changed().unwrap_or(false) {
            change.debug = Some(*self.debug.borrow_and_update());
        }
        change
    }
}
