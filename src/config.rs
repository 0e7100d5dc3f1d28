//! Configuration management for cinemator
//!
//! Handles config file loading/saving and server URL resolution.
//! Config is stored at ~/.config/cinemator/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::api::server::{DEFAULT_FILES_PATH, DEFAULT_PREPARE_PATH};
use crate::api::CinematorClient;
use crate::stream::PlayerType;
use crate::ui::theme::ThemeMode;

/// Server used when nothing else is configured
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Environment variable overriding the server URL
pub const SERVER_ENV: &str = "CINEMATOR_SERVER";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Base URL of the cinemator server
    pub server_url: String,
    /// Path of the file-listing endpoint
    pub files_path: String,
    /// Path of the prepare endpoint
    pub prepare_path: String,
    /// Local player used for playback
    pub player: PlayerType,
    /// Probe the manifest before launching the player
    pub adaptive_engine: bool,
    /// Reloads of an empty live playlist before playback gives up.
    /// Unset means wait as long as the server needs.
    pub segment_poll_limit: Option<u32>,
    /// Persisted theme, detected from the terminal when unset
    pub theme_mode: Option<ThemeMode>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            files_path: DEFAULT_FILES_PATH.to_string(),
            prepare_path: DEFAULT_PREPARE_PATH.to_string(),
            player: PlayerType::default(),
            adaptive_engine: true,
            segment_poll_limit: None,
            theme_mode: None,
        }
    }
}

impl Config {
    /// Get config file path (~/.config/cinemator/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cinemator").join("config.toml"))
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default()
    }

    /// Load config from a file, or return default if missing or unreadable
    pub fn load_from(path: &Path) -> Self {
        let Ok(text) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        toml::from_str(&text).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "ignoring invalid config file");
            Self::default()
        })
    }

    /// Persist the theme mode to the default path
    pub fn save_theme(mode: ThemeMode) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;
        Self::save_theme_to(&path, mode)
    }

    /// Write `theme-mode` into a config file, leaving every other key as the
    /// user wrote it.
    ///
    /// Nothing is written when the existing file is not valid TOML.
    pub fn save_theme_to(path: &Path, mode: ThemeMode) -> Result<()> {
        let mut table = match std::fs::read_to_string(path) {
            Ok(text) => text
                .parse::<toml::Table>()
                .with_context(|| format!("parsing {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => toml::Table::new(),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        table.insert("theme-mode".to_string(), toml::Value::try_from(mode)?);

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let toml = toml::to_string_pretty(&table)?;
        std::fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Server URL with fallback chain:
    /// 1. Explicit override (the `--server` flag)
    /// 2. Environment variable CINEMATOR_SERVER
    /// 3. Config file value
    pub fn resolve_server(&self, flag: Option<&str>) -> String {
        if let Some(url) = flag.filter(|u| !u.trim().is_empty()) {
            return url.trim().to_string();
        }
        if let Ok(url) = std::env::var(SERVER_ENV) {
            if !url.trim().is_empty() {
                return url.trim().to_string();
            }
        }
        self.server_url.clone()
    }

    /// Theme to start with
    pub fn theme_mode(&self) -> ThemeMode {
        self.theme_mode.unwrap_or_else(ThemeMode::detect)
    }

    /// Build a server client from this config
    pub fn client(&self, server: &str) -> CinematorClient {
        CinematorClient::with_paths(server, &self.files_path, &self.prepare_path)
    }
}
