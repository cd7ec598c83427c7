use crate::text_injection::PasteMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings persisted at `~/.config/murmur/config.json`, grouped by the
/// collaborator they feed. Missing sections and fields fall back to their
/// defaults, so a partial file keeps working across upgrades.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub transcription: TranscriptionConfig,
    pub recording: RecordingConfig,
    pub insertion: InsertionConfig,
    pub sounds: SoundConfig,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub api_url: String,
    /// Empty until the user configures one; recording is refused without it.
    pub api_key: String,
    pub model: String,
    /// Language of the audio, or "auto" / unset for auto-detect.
    pub language: Option<String>,
    pub prompt: Option<String>,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "whisper-1".to_string(),
            language: None,
            prompt: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Ordered encoding preference, most preferred first. The first entry
    /// this build supports wins.
    pub preferred_formats: Vec<String>,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            preferred_formats: vec!["audio/wav".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct InsertionConfig {
    pub paste_mode: String,
}

impl Default for InsertionConfig {
    fn default() -> Self {
        Self {
            paste_mode: "ctrl_shift".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SoundConfig {
    pub enabled: bool,
    pub start: String,
    pub stop: String,
    pub complete: String,
    pub error: String,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start: "ping-up.opus".to_string(),
            stop: "ping-down.opus".to_string(),
            complete: "ping-done.opus".to_string(),
            error: "ping-error.opus".to_string(),
        }
    }
}

impl Config {
    /// Load the config file, writing a default one on first run.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            tracing::info!("Config file not found at {:?}, creating default config", path);
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_dir.join("murmur").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.transcription.api_url.is_empty() {
            return Err(anyhow::anyhow!("transcription.api_url cannot be empty"));
        }

        if self.transcription.model.is_empty() {
            return Err(anyhow::anyhow!("transcription.model cannot be empty"));
        }

        if PasteMode::parse(&self.insertion.paste_mode).is_none() {
            return Err(anyhow::anyhow!(
                "insertion.paste_mode must be one of: super, ctrl_shift, ctrl"
            ));
        }

        Ok(())
    }
}
