use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

const DEFAULT_PLAYER_PROGRAM: &str = "cvlc";
const DEFAULT_METADATA_POLL_MS: u64 = 5_000;
const APP_DIR: &str = "nightride";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    pub program: String,
    pub metadata_poll_ms: u64,
}

impl PlayerConfig {
    pub fn metadata_poll(&self) -> Duration {
        Duration::from_millis(self.metadata_poll_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub player: PlayerConfig,
    pub settings_path: PathBuf,
    pub log_file: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            player: PlayerConfig {
                program: DEFAULT_PLAYER_PROGRAM.to_string(),
                metadata_poll_ms: DEFAULT_METADATA_POLL_MS,
            },
            settings_path: config_dir().join("settings.json"),
            log_file: data_dir().join("nightride.log"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    player: FilePlayer,
    #[serde(default)]
    settings: FileSettings,
    #[serde(default)]
    logging: FileLogging,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FilePlayer {
    program: Option<String>,
    metadata_poll_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileLogging {
    file: Option<PathBuf>,
}

impl RuntimeConfig {
    pub fn default_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        config.merge_file(path)?;
        config.merge_env()?;
        Ok(config)
    }

    fn merge_file(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading config file: {}", path.display()))?;
        self.merge_toml_text(&content)
            .with_context(|| format!("failed parsing config TOML: {}", path.display()))
    }

    fn merge_toml_text(&mut self, content: &str) -> Result<()> {
        let file: FileConfig = toml::from_str(content)?;

        if let Some(program) = file.player.program {
            self.player.program = non_empty(program, "player.program")?;
        }
        if let Some(poll) = file.player.metadata_poll_ms {
            self.player.metadata_poll_ms = positive(poll, "player.metadata_poll_ms")?;
        }
        if let Some(path) = file.settings.path {
            self.settings_path = path;
        }
        if let Some(path) = file.logging.file {
            self.log_file = path;
        }

        Ok(())
    }

    fn merge_env(&mut self) -> Result<()> {
        if let Ok(program) = env::var("NIGHTRIDE_PLAYER") {
            self.player.program =
                non_empty(program, "NIGHTRIDE_PLAYER").context("invalid NIGHTRIDE_PLAYER")?;
        }
        if let Ok(poll) = env::var("NIGHTRIDE_METADATA_POLL_MS") {
            let poll = poll
                .parse::<u64>()
                .with_context(|| "invalid NIGHTRIDE_METADATA_POLL_MS".to_string())?;
            self.player.metadata_poll_ms = positive(poll, "NIGHTRIDE_METADATA_POLL_MS")?;
        }
        if let Ok(path) = env::var("NIGHTRIDE_SETTINGS_PATH") {
            self.settings_path = PathBuf::from(path);
        }
        if let Ok(path) = env::var("NIGHTRIDE_LOG_FILE") {
            self.log_file = PathBuf::from(path);
        }

        Ok(())
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn non_empty(value: String, key: &str) -> Result<String> {
    if value.trim().is_empty() {
        Err(anyhow!("{key} cannot be empty"))
    } else {
        Ok(value)
    }
}

fn positive(value: u64, key: &str) -> Result<u64> {
    if value == 0 {
        Err(anyhow!("{key} must be greater than zero"))
    } else {
        Ok(value)
    }
}
