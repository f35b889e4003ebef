// Persistent settings (config.json)
//
// Holds the active model name. Unknown keys are preserved on rewrite.
// A missing or corrupt file is replaced with defaults.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub active_model: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    // Serialises read-modify-write cycles
    lock: Arc<Mutex<()>>,
}

impl SettingsStore {
    /// Open the settings file, creating it with defaults if absent
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        };
        if let Some(parent) = store.path.parent() {
            fs::create_dir_all(parent)?;
        }
        if !store.path.exists() {
            store.write(&Settings::default())?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Settings> {
        let _guard = self.lock.lock();
        self.read()
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        let _guard = self.lock.lock();
        self.write(settings)
    }

    pub fn active_model(&self) -> Result<Option<String>> {
        Ok(self.load()?.active_model)
    }

    pub fn set_active_model(&self, name: Option<String>) -> Result<()> {
        self.update(|settings| settings.active_model = name)
    }

    /// Set the active model only if none is set. Returns the active model afterwards.
    pub fn activate_if_unset(&self, name: &str) -> Result<Option<String>> {
        let mut active = None;
        self.update(|settings| {
            if settings.active_model.is_none() {
                settings.active_model = Some(name.to_string());
            }
            active = settings.active_model.clone();
        })?;
        Ok(active)
    }

    /// Clear the active model if it is `name`
    pub fn clear_if_active(&self, name: &str) -> Result<()> {
        self.update(|settings| {
            if settings.active_model.as_deref() == Some(name) {
                settings.active_model = None;
            }
        })
    }

    fn update(&self, f: impl FnOnce(&mut Settings)) -> Result<()> {
        let _guard = self.lock.lock();
        let mut settings = self.read()?;
        f(&mut settings);
        self.write(&settings)
    }

    fn read(&self) -> Result<Settings> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Settings::default()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Resetting corrupt settings file");
                let defaults = Settings::default();
                self.write(&defaults)?;
                Ok(defaults)
            }
        }
    }

    fn write(&self, settings: &Settings) -> Result<()> {
        fs::write(&self.path, serde_json::to_string_pretty(settings)?)?;
        Ok(())
    }
}
