//! Settings, file locations and the JSON persistence used by the CLI.
//!
//! Nothing here is read implicitly: the binary resolves an [`AppPaths`],
//! builds the stores it needs and passes them to whoever loads or saves.
//!
//! Default data directory:
//! - Linux: `~/.local/share/vip-reconcile/`
//! - macOS: `~/Library/Application Support/vip-reconcile/`
//! - Windows: `%LOCALAPPDATA%/vip-reconcile/`

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::marker::PhantomData;
use std::path::PathBuf;

pub const APP_DIR_NAME: &str = "vip-reconcile";
pub const SETTINGS_FILE: &str = "settings.json";
pub const COOKIE_FILE: &str = "cookie.json";

// ============================================================================
// Persistence
// ============================================================================

/// Load/save of one persisted value.
pub trait Store<T> {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<T>>;
    fn save(&self, value: &T) -> Result<()>;
}

/// A value persisted as pretty-printed JSON in one file.
#[derive(Debug, Clone)]
pub struct JsonFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFile<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> Store<T> for JsonFile<T> {
    fn load(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(Some(value))
    }

    fn save(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore<T> {
    value: RefCell<Option<T>>,
}

impl<T> MemoryStore<T> {
    pub fn new(value: Option<T>) -> Self {
        Self {
            value: RefCell::new(value),
        }
    }

    pub fn into_inner(self) -> Option<T> {
        self.value.into_inner()
    }
}

impl<T: Clone> Store<T> for MemoryStore<T> {
    fn load(&self) -> Result<Option<T>> {
        Ok(self.value.borrow().clone())
    }

    fn save(&self, value: &T) -> Result<()> {
        *self.value.borrow_mut() = Some(value.clone());
        Ok(())
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Values remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Last playlist processed
    #[serde(default)]
    pub playlist_id: Option<String>,
}

impl Settings {
    /// Record `playlist_id` as the remembered playlist and persist.
    pub fn remember_playlist(store: &impl Store<Settings>, playlist_id: &str) -> Result<()> {
        let mut settings = store.load()?.unwrap_or_default();
        settings.playlist_id = Some(playlist_id.to_string());
        store.save(&settings)
    }

    /// Remembered playlist id, ignoring blank values.
    pub fn saved_playlist(store: &impl Store<Settings>) -> Result<Option<String>> {
        Ok(store
            .load()?
            .and_then(|s| s.playlist_id)
            .filter(|id| !id.trim().is_empty()))
    }
}

// ============================================================================
// Paths
// ============================================================================

/// File locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl AppPaths {
    /// Explicit directories win; the data directory otherwise falls back to
    /// the platform data dir, then the working directory.
    pub fn resolve(data_dir: Option<PathBuf>, output_dir: Option<PathBuf>) -> Self {
        let data_dir = data_dir.unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join(APP_DIR_NAME))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        Self {
            data_dir,
            output_dir: output_dir.unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    pub fn settings_file(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }

    pub fn cookie_file(&self) -> PathBuf {
        self.data_dir.join(COOKIE_FILE)
    }

    /// Files a report must never overwrite.
    pub fn protected_files(&self) -> Vec<PathBuf> {
        vec![self.settings_file(), self.cookie_file()]
    }
}
