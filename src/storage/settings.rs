use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::catalog::StationCatalog;

pub const DEFAULT_VOLUME: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default)]
    pub station: Option<String>,
}

fn default_volume() -> f64 {
    DEFAULT_VOLUME
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            station: None,
        }
    }
}

impl Settings {
    /// Clamps the volume and replaces an unknown station with the catalog default.
    pub fn sanitized(self, catalog: &StationCatalog) -> Self {
        let station = self
            .station
            .filter(|key| catalog.lookup(key).is_some())
            .unwrap_or_else(|| catalog.default_station().key.to_string());
        Self {
            volume: clamp_volume(self.volume),
            station: Some(station),
        }
    }
}

pub fn clamp_volume(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

pub trait SettingsStore {
    fn load(&self) -> Result<Settings>;
    fn save(&mut self, settings: &Settings) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read settings file: {}", self.path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse settings file: {}", self.path.display()))
    }

    fn save(&mut self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create settings directory: {}", parent.display())
            })?;
        }

        let body = serde_json::to_string_pretty(settings).context("failed to serialize settings")?;
        fs::write(&self.path, body)
            .with_context(|| format!("failed to write settings file: {}", self.path.display()))?;

        Ok(())
    }
}
