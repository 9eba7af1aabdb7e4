//! Configuration loading and root folder resolution
//!
//! Resolution order for the root folder:
//! 1. Command-line argument (highest priority)
//! 2. `JAMSYNC_ROOT_FOLDER` environment variable
//! 3. `root_folder` in the TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or malformed TOML file is never fatal: it logs a warning and
//! the compiled defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "JAMSYNC_ROOT_FOLDER";

/// SQLite database file name inside the root folder
pub const DATABASE_FILE: &str = "jamsync.db";

/// Tempo a new live session starts with
pub const DEFAULT_SESSION_BPM: i64 = 80;

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub logging: LoggingConfig,
    pub session: SessionConfig,
    pub feeds: FeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Filter directives for the server and its library crates
    pub fn filter_directives(&self) -> String {
        let level = self.level.trim();
        let level = if level.is_empty() { "info" } else { level };
        format!("jamsync_server={level},jamsync_common={level},tower_http={level}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub default_bpm: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_bpm: DEFAULT_SESSION_BPM,
        }
    }
}

/// External feed endpoints and their timeouts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedConfig {
    pub lyrics_base_url: String,
    pub tablature_base_url: String,
    pub catalog_base_url: String,
    pub lyrics_timeout_secs: u64,
    pub tablature_search_timeout_secs: u64,
    pub tablature_timeout_secs: u64,
    pub catalog_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            lyrics_base_url: "https://lrclib.net/api".to_string(),
            tablature_base_url: "https://www.songsterr.com/a/ra".to_string(),
            catalog_base_url: "https://itunes.apple.com".to_string(),
            lyrics_timeout_secs: 6,
            tablature_search_timeout_secs: 6,
            tablature_timeout_secs: 8,
            catalog_timeout_secs: 8,
        }
    }
}

impl FeedConfig {
    pub fn lyrics_timeout(&self) -> Duration {
        Duration::from_secs(self.lyrics_timeout_secs)
    }

    pub fn tablature_search_timeout(&self) -> Duration {
        Duration::from_secs(self.tablature_search_timeout_secs)
    }

    pub fn tablature_timeout(&self) -> Duration {
        Duration::from_secs(self.tablature_timeout_secs)
    }

    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog_timeout_secs)
    }
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Load a config file, degrading to defaults on any failure
    ///
    /// `None` looks in the platform config directory; absence there is
    /// silent, while an explicit path that fails to load is warned about.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return Self::default(),
            },
        };

        if !path.exists() {
            if explicit {
                warn!("Config file {} not found, using defaults", path.display());
            }
            return Self::default();
        }

        match Self::from_file(&path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }
}

/// `<config dir>/jamsync/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("jamsync").join("config.toml"))
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("jamsync"))
        .unwrap_or_else(|| PathBuf::from("./jamsync_data"))
}

/// Resolves the root folder from CLI, environment, TOML and defaults
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml: &TomlConfig) -> Self {
        Self {
            cli_arg,
            toml_value: toml.root_folder.clone(),
        }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }
        if let Some(path) = &self.toml_value {
            return path.clone();
        }
        default_root_folder()
    }
}

/// Creates the root folder and locates the database inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }
}
