//! Configuration for sfterm.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Built-in defaults
//! 2. `~/.sfterm/config.toml`
//! 3. Environment: `TOP_HEIGHT`, `MID_HEIGHT`, `INSET_LEFT`, `INSET_RIGHT`,
//!    `SHELL_CMD`
//!
//! Command-line flags are applied on top by `main`.
//!
//! # Configuration File
//!
//! ```toml
//! # Program to run in the frame (must be an executable file)
//! shell = "/bin/bash"
//!
//! # vt100 or none
//! engine = "vt100"
//!
//! [chrome]
//! banner_height = 6
//! frame_height = 12
//! inset_left = 2
//! inset_right = 2
//!
//! [theme]
//! border = [255, 105, 180]
//! title = "sfterm"
//! ```

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::core::engine::EngineKind;
use crate::ui::chrome::Theme;
use crate::ui::layout::ChromeConfig;

/// Shell used when nothing else is usable
pub const FALLBACK_SHELL: &str = "/bin/sh";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Program to run in the frame
    pub shell: Option<String>,
    /// Terminal engine
    pub engine: EngineKind,
    /// Readiness wait per loop iteration, in milliseconds
    pub poll_interval_ms: u64,
    pub chrome: ChromeConfig,
    pub theme: Theme,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: None,
            engine: EngineKind::default(),
            poll_interval_ms: 20,
            chrome: ChromeConfig::default(),
            theme: Theme::default(),
        }
    }
}

impl Config {
    /// Load the config file and the environment overrides.
    ///
    /// A missing file is fine; an unreadable or malformed one is logged and
    /// the defaults are used instead.
    pub fn load() -> Self {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => match Self::load_from(&path) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("{}; using defaults", e);
                    Self::default()
                }
            },
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Parse a config file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides. Unparseable numbers are skipped.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let numeric: [(&str, &mut u16); 4] = [
            ("TOP_HEIGHT", &mut self.chrome.banner_height),
            ("MID_HEIGHT", &mut self.chrome.frame_height),
            ("INSET_LEFT", &mut self.chrome.inset_left),
            ("INSET_RIGHT", &mut self.chrome.inset_right),
        ];
        for (key, slot) in numeric {
            if let Some(value) = lookup(key) {
                match parse_u16(key, &value) {
                    Ok(n) => *slot = n,
                    Err(e) => warn!("{}", e),
                }
            }
        }

        if let Some(shell) = lookup("SHELL_CMD") {
            if !shell.is_empty() {
                self.shell = Some(shell);
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Get config file path
    pub fn config_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".sfterm").join("config.toml"))
    }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Pick the program to run: the configured one if it is an executable file,
/// else the login shell, else [`FALLBACK_SHELL`].
pub fn resolve_shell(configured: Option<&str>, login_shell: Option<&str>) -> PathBuf {
    if let Some(path) = configured {
        if is_executable(Path::new(path)) {
            return PathBuf::from(path);
        }
        warn!("Configured shell {} is not an executable file", path);
    }

    if let Some(path) = login_shell {
        if is_executable(Path::new(path)) {
            info!("Using login shell {}", path);
            return PathBuf::from(path);
        }
        warn!("Login shell {} is not an executable file", path);
    }

    info!("Falling back to {}", FALLBACK_SHELL);
    PathBuf::from(FALLBACK_SHELL)
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Get home directory
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}
