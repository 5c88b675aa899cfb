//! Configuration loading and project root resolution
//!
//! Settings come from an optional TOML file. A missing or malformed file is
//! never fatal: it is logged and the built-in defaults are used instead.
//!
//! Project root priority order:
//! 1. Command-line argument (highest priority)
//! 2. `TGSYNC_PROJECT` environment variable
//! 3. `project_root` in the TOML config file
//! 4. Current working directory (fallback)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Environment variable naming the project root
pub const PROJECT_ENV_VAR: &str = "TGSYNC_PROJECT";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Project folder holding the TextGrid store
    #[serde(default)]
    pub project_root: Option<PathBuf>,

    #[serde(default)]
    pub praat: PraatConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// External tool settings
#[derive(Debug, Clone, Deserialize)]
pub struct PraatConfig {
    /// Praat executable used for `--send`
    #[serde(default = "default_praat_binary")]
    pub binary: String,

    /// Praat preferences folder (where `praat_backToCaller.Data` appears).
    /// Platform default when not set.
    #[serde(default)]
    pub prefs_dir: Option<PathBuf>,

    /// Open the whole recording instead of only the record's segment
    #[serde(default)]
    pub use_full_audio: bool,
}

impl Default for PraatConfig {
    fn default() -> Self {
        Self {
            binary: default_praat_binary(),
            prefs_dir: None,
            use_full_audio: false,
        }
    }
}

impl PraatConfig {
    /// Configured preferences folder, or the platform default
    pub fn resolved_prefs_dir(&self) -> PathBuf {
        self.prefs_dir
            .clone()
            .unwrap_or_else(default_praat_prefs_dir)
    }
}

/// Event bus settings
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_praat_binary() -> String {
    "praat".to_string()
}

fn default_event_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a specific config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load from the platform config location, falling back to defaults
    pub fn load_or_default() -> Self {
        let Some(path) = config_file_path() else {
            debug!("No config directory on this platform, using defaults");
            return Self::default();
        };
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Resolve the project root following the documented priority order
    pub fn resolve_project_root(&self, cli_arg: Option<&Path>) -> Result<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return Ok(path.to_path_buf());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(PROJECT_ENV_VAR) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &self.project_root {
            return Ok(path.clone());
        }

        // Priority 4: Current directory
        std::env::current_dir().map_err(Error::Io)
    }
}

/// `<config dir>/tgsync/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tgsync").join("config.toml"))
}

/// Platform default Praat preferences folder
pub fn default_praat_prefs_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    if cfg!(target_os = "macos") {
        home.join("Library").join("Preferences").join("Praat Prefs")
    } else if cfg!(target_os = "windows") {
        home.join("Praat")
    } else {
        home.join(".praat-dir")
    }
}
