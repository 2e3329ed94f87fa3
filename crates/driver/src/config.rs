//! Driver configuration management

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub transfer: TransferSettings,
    #[serde(default)]
    pub magtek: MagtekSettings,
    #[serde(default)]
    pub idtech: IdTechSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "LoggingSettings::default_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

impl LoggingSettings {
    fn default_level() -> String {
        "info".to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSettings {
    /// Timeout handed to every control transfer
    #[serde(default = "TransferSettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

impl TransferSettings {
    fn default_timeout_ms() -> u64 {
        5000
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Magtek protocol settings
///
/// # Example Configuration
/// ```toml
/// [magtek]
/// buffer_sizes = [24, 60]
/// reset_settle_ms = 5000
/// validate_negotiation = false
/// default_sn_length = 7
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagtekSettings {
    /// Candidate control buffer sizes, tried in order
    #[serde(default = "MagtekSettings::default_buffer_sizes")]
    pub buffer_sizes: Vec<usize>,
    /// Wait after a reset so the device can re-enumerate
    #[serde(default = "MagtekSettings::default_reset_settle_ms")]
    pub reset_settle_ms: u64,
    /// Also require a success result code while negotiating
    #[serde(default)]
    pub validate_negotiation: bool,
    /// Characters copied by `set_default_sn`
    #[serde(default = "MagtekSettings::default_sn_length")]
    pub default_sn_length: usize,
}

impl Default for MagtekSettings {
    fn default() -> Self {
        Self {
            buffer_sizes: Self::default_buffer_sizes(),
            reset_settle_ms: Self::default_reset_settle_ms(),
            validate_negotiation: false,
            default_sn_length: Self::default_sn_length(),
        }
    }
}

impl MagtekSettings {
    fn default_buffer_sizes() -> Vec<usize> {
        vec![24, 60]
    }

    fn default_reset_settle_ms() -> u64 {
        5000
    }

    fn default_sn_length() -> usize {
        7
    }

    pub fn reset_settle(&self) -> Duration {
        Duration::from_millis(self.reset_settle_ms)
    }
}

/// IDTech protocol settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTechSettings {
    /// Size of each SET_REPORT / GET_REPORT transfer
    #[serde(default = "IdTechSettings::default_chunk_size")]
    pub chunk_size: usize,
    /// Wait between sending a command and polling for the reply
    #[serde(default = "IdTechSettings::default_settle_ms")]
    pub settle_ms: u64,
    /// Upper bound on collected reply bytes
    #[serde(default = "IdTechSettings::default_max_response_len")]
    pub max_response_len: usize,
}

impl Default for IdTechSettings {
    fn default() -> Self {
        Self {
            chunk_size: Self::default_chunk_size(),
            settle_ms: Self::default_settle_ms(),
            max_response_len: Self::default_max_response_len(),
        }
    }
}

impl IdTechSettings {
    fn default_chunk_size() -> usize {
        protocol::frame::DEFAULT_CHUNK_SIZE
    }

    fn default_settle_ms() -> u64 {
        1000
    }

    fn default_max_response_len() -> usize {
        1024
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl DriverConfig {
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/hid-nvram/driver.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: DriverConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Install the tracing subscriber at the configured level
    pub fn setup_logging(&self) -> common::Result<()> {
        common::setup_logging(&self.logging.level)
    }

    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("hid-nvram").join("driver.toml")
        } else {
            PathBuf::from(".config/hid-nvram/driver.toml")
        }
    }

    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ));
        }

        if self.magtek.buffer_sizes.is_empty() {
            return Err(anyhow!("magtek.buffer_sizes must list at least one size"));
        }
        // Opcode, length and property ID must fit
        if let Some(size) = self.magtek.buffer_sizes.iter().find(|&&s| s < 3) {
            return Err(anyhow!(
                "Invalid Magtek buffer size {}, must be at least 3",
                size
            ));
        }

        if self.idtech.chunk_size == 0 {
            return Err(anyhow!("idtech.chunk_size must be greater than 0"));
        }
        if self.idtech.max_response_len < self.idtech.chunk_size {
            return Err(anyhow!(
                "idtech.max_response_len ({}) is smaller than one chunk ({})",
                self.idtech.max_response_len,
                self.idtech.chunk_size
            ));
        }

        Ok(())
    }
}
