//! Persistent configuration for simrepeat.
//!
//! Stores user settings in `~/.simrepeat/config.json` (or
//! `$SIMREPEAT_HOME/config.json`). Every field is optional; the main use is
//! pointing at a platform installation that is not in the default location.
//!
//! ```json
//! {
//!   "platform_dir": "/opt/isaac-sim",
//!   "runner_args": ["--no-capture"]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

const CONFIG_FILENAME: &str = "config.json";

/// Environment variable that relocates the simrepeat directory.
pub const HOME_ENV: &str = "SIMREPEAT_HOME";

/// Errors from reading the config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Returns the simrepeat directory: `$SIMREPEAT_HOME` if set, else `~/.simrepeat`.
pub fn simrepeat_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".simrepeat")
}

/// Persistent simrepeat configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SimrepeatConfig {
    /// Root of the simulation platform installation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_dir: Option<PathBuf>,

    /// Interpreter relative to `platform_dir`, or absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,

    /// Module passed to the interpreter with `-m`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner_module: Option<String>,

    /// Fixed arguments placed before the forwarded ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runner_args: Vec<String>,
}

impl SimrepeatConfig {
    /// Location of the config file.
    pub fn path() -> PathBuf {
        simrepeat_dir().join(CONFIG_FILENAME)
    }

    /// Load config from [`Self::path`].
    ///
    /// Returns [`Default`] if the file does not exist. A file that exists but
    /// cannot be read or parsed is logged and also yields [`Default`].
    pub fn load() -> Self {
        let path = Self::path();
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                Self::default()
            }
        }
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
