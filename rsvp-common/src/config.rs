//! Configuration loading and root folder resolution
//!
//! Every setting is resolved in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "RSVP_ROOT_FOLDER";

/// Environment variable overriding the public base URL for invitation links
pub const BASE_URL_ENV: &str = "RSVP_BASE_URL";

/// Base URL used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Database file name used when nothing else is configured
pub const DEFAULT_DATABASE_FILE: &str = "rsvp.db";

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub base_url: Option<String>,
    pub database_file: Option<String>,
}

impl TomlConfig {
    /// Parse config file contents
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Load the config file from `path`
    ///
    /// A missing or malformed file is not fatal: it is logged and treated as empty.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                debug!("No config file at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Resolved runtime settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Folder holding the database file
    pub root_folder: PathBuf,
    /// Database file name inside the root folder
    pub database_file: String,
    /// Public URL guests reach the RSVP pages on; used to build invitation links
    pub base_url: String,
}

impl Settings {
    /// Resolve settings from CLI overrides, the environment, the config file and defaults
    pub fn resolve(cli_root_folder: Option<&Path>, cli_base_url: Option<&str>) -> Self {
        let file = TomlConfig::load_or_default(default_config_path().as_deref());
        Self::resolve_with(cli_root_folder, cli_base_url, &file)
    }

    /// Same as [`Settings::resolve`] with an explicit config file
    pub fn resolve_with(
        cli_root_folder: Option<&Path>,
        cli_base_url: Option<&str>,
        file: &TomlConfig,
    ) -> Self {
        let root_folder = cli_root_folder
            .map(Path::to_path_buf)
            .or_else(|| non_empty_env(ROOT_FOLDER_ENV).map(PathBuf::from))
            .or_else(|| file.root_folder.clone())
            .unwrap_or_else(default_root_folder);

        let base_url = cli_base_url
            .map(str::to_string)
            .or_else(|| non_empty_env(BASE_URL_ENV))
            .or_else(|| file.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let database_file = file
            .database_file
            .clone()
            .unwrap_or_else(|| DEFAULT_DATABASE_FILE.to_string());

        Self {
            root_folder,
            database_file,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Full path of the database file
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(&self.database_file)
    }

    /// Create the root folder if missing
    pub fn ensure_root_folder(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Default config file location: `<config_dir>/rsvp/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rsvp").join("config.toml"))
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/rsvp (or /var/lib/rsvp for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("rsvp"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/rsvp"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("rsvp"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/rsvp"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("rsvp"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\rsvp"))
    } else {
        PathBuf::from("./rsvp_data")
    }
}
