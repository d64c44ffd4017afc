use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Tunables for the monitoring pipeline.
///
/// Loaded once at startup; defaults apply for anything missing from the
/// config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Base interval of the GPU process polling job
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Coalescing window for update batches
    #[serde(default = "default_batch_window_ms")]
    pub batch_window_ms: u64,
    /// Interval multiplier while the app is in the background
    #[serde(default = "default_background_factor")]
    pub background_factor: u32,
    /// Poll error rate above which intervals double
    #[serde(default = "default_error_rate_threshold")]
    pub error_rate_threshold: f64,
    /// How many past snapshots are kept for delta replay
    #[serde(default = "default_history_retention")]
    pub history_retention: usize,
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_batch_window_ms() -> u64 {
    200
}

fn default_background_factor() -> u32 {
    4
}

fn default_error_rate_threshold() -> f64 {
    0.5
}

fn default_history_retention() -> usize {
    32
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            batch_window_ms: default_batch_window_ms(),
            background_factor: default_background_factor(),
            error_rate_threshold: default_error_rate_threshold(),
            history_retention: default_history_retention(),
        }
    }
}

impl MonitorConfig {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(MonitorConfig::default());
        }

        let data = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        if data.trim().is_empty() {
            return Ok(MonitorConfig::default());
        }

        // A corrupted file falls back to defaults rather than refusing to start
        Ok(serde_json::from_str(&data).unwrap_or_default())
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, data)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("gpumon").join("config.json"))
    }
}
