//! Local client configuration.
//!
//! Persisted as JSON in `~/.Trixie.json`:
//!
//! ```json
//! {"TrixieURL": "https://trixie.bigpoint.net", "AuthToken": "", "AuthTokenValidity": 0}
//! ```
//!
//! `AuthTokenValidity` is the unix time (seconds) until which the token is
//! accepted. The file is created with defaults on first use and is only
//! readable by its owner.

// ============================================================================
// Imports
// ============================================================================

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Service used when the config file does not name one.
pub const DEFAULT_URL: &str = "https://trixie.bigpoint.net";

/// Config file name inside the home directory.
pub const CONFIG_FILE_NAME: &str = ".Trixie.json";

// ============================================================================
// Config
// ============================================================================

/// Contents of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the Trixie service.
    #[serde(rename = "TrixieURL")]
    pub url: String,

    /// Token sent in the auth frame and the `X-Trixie-Auth` header.
    #[serde(rename = "AuthToken", default)]
    pub auth_token: String,

    /// Unix time until which the token is valid.
    #[serde(rename = "AuthTokenValidity", default)]
    pub auth_token_validity: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            auth_token: String::new(),
            auth_token_validity: 0,
        }
    }
}

impl Config {
    /// Returns `~/.Trixie.json`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the home directory is unknown.
    pub fn default_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_FILE_NAME))
            .ok_or_else(|| Error::config("Cannot determine the home directory"))
    }

    /// Writes a default config to `path` if nothing is there.
    ///
    /// Returns `true` if the file was created.
    pub fn ensure_exists(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }

        Self::default().save(path)?;
        debug!(path = %path.display(), "Default config created");
        Ok(true)
    }

    /// Reads the config at `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the file cannot be read
    /// - [`Error::Config`] if it is not a valid config
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;

        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            Error::config(format!("Failed to parse {}: {e}", path.display()))
        })?;

        if config.url.trim().is_empty() {
            return Err(Error::config(format!(
                "{} has an empty TrixieURL",
                path.display()
            )));
        }

        Ok(config)
    }

    /// Writes the config to `path` with owner-only permissions.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec(self)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        file.write_all(&json)?;
        Ok(())
    }

    /// Returns `true` if the token's validity ended before `now`.
    #[inline]
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        now > u64::from(self.auth_token_validity)
    }

    /// Replaces the token and its validity.
    pub fn set_token(&mut self, token: impl Into<String>, validity: u32) {
        self.auth_token = token.into();
        self.auth_token_validity = validity;
    }
}

// ============================================================================
// Tests
// ============================================================================
