// Configuration management module
// Handles loading, saving, and validating configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "plex-presence";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub plex: PlexConfig,
    pub discord: DiscordConfig,
    pub imgur: ImgurConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlexConfig {
    /// Candidate server names, first match wins
    pub servers: Vec<String>,

    /// Eligible usernames in priority order
    pub users: Vec<String>,

    /// Poll interval in seconds
    pub refresh_rate: u64,

    /// Credentials used when no valid token is stored
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub two_factor: bool,
}

impl Default for PlexConfig {
    fn default() -> Self {
        Self {
            servers: vec![String::new()],
            users: vec![String::new()],
            refresh_rate: 5,
            username: String::new(),
            password: String::new(),
            two_factor: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DiscordConfig {
    pub app_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImgurConfig {
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub severity: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            severity: "info".to_string(),
        }
    }
}

/// Directory holding the config file and the stored Plex token
pub fn config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("Failed to get config directory")?;

    Ok(config_dir.join(APP_DIR))
}

/// Default root of the on-disk artwork cache
pub fn cache_dir() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir().context("Failed to get cache directory")?;

    Ok(cache_dir.join(APP_DIR))
}

impl Config {
    /// Get the default path to the configuration file
    pub fn default_path() -> Result<PathBuf> {
        Ok(config_dir()?.join("config.toml"))
    }

    /// Load configuration from file.
    ///
    /// A missing file is replaced by a default template and reported as an
    /// error, since the template has no usable servers or credentials yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("Config file not found, creating default at {:?}", path);
            Self::default().save(path)?;
            anyhow::bail!(
                "Fill in the configuration at {} and start again",
                path.display()
            );
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config = Self::parse(&content, is_json(path))?;

        config.validate()?;

        Ok(config)
    }

    fn parse(content: &str, json: bool) -> Result<Self> {
        if json {
            serde_json::from_str(content).context("Failed to parse config file")
        } else {
            toml::from_str(content).context("Failed to parse config file")
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = if is_json(path) {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        } else {
            toml::to_string_pretty(self).context("Failed to serialize config")?
        };

        fs::write(path, content).context("Failed to write config file")?;

        log::info!("Config saved to {:?}", path);

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.plex.refresh_rate == 0 {
            anyhow::bail!("plex.refreshRate must be greater than 0");
        }

        if self.plex.servers.iter().all(|s| s.trim().is_empty()) {
            anyhow::bail!("plex.servers must name at least one server");
        }

        if self.plex.users.iter().all(|u| u.trim().is_empty()) {
            anyhow::bail!("plex.users must name at least one user");
        }

        if self.discord.app_id.trim().is_empty() {
            anyhow::bail!("discord.appId is required");
        }

        if self.imgur.client_id.trim().is_empty() {
            anyhow::bail!("imgur.clientId is required");
        }

        if self.plex.username.is_empty() {
            log::warn!("plex.username is empty, login will rely on a stored token");
        }

        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
