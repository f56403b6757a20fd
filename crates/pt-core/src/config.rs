//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! server, auth, and media sub-configs. Every section defaults sensibly so a
//! completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub media: MediaConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.auth.session_timeout_hours == 0 {
            warnings.push("auth.session_timeout_hours is 0; sessions expire immediately".into());
        }

        if self.media.picture_size == 0 {
            warnings.push("media.picture_size is 0; uploads will be rejected".into());
        }

        if self.media.max_upload_bytes == 0 {
            warnings.push("media.max_upload_bytes is 0; uploads will be rejected".into());
        }

        if !self.media.url_prefix.starts_with('/') {
            warnings.push(format!(
                "media.url_prefix '{}' should start with '/'",
                self.media.url_prefix
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            db_path: PathBuf::from("/data/portrait.db"),
        }
    }
}

/// Session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub session_timeout_hours: u64,
    /// Mark the session cookie `Secure` (only sent over HTTPS).
    pub secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_timeout_hours: 24,
            secure_cookies: false,
        }
    }
}

/// Profile picture storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory that stored pictures (and `default.png`) live under.
    pub root: PathBuf,
    /// URL prefix the media root is served from.
    pub url_prefix: String,
    /// Side length of normalized pictures, in pixels.
    pub picture_size: u32,
    /// Largest accepted upload body.
    pub max_upload_bytes: usize,
}

impl MediaConfig {
    /// URL path the media root is mounted at: leading `/`, no trailing `/`,
    /// never the site root. Falls back to `/media`.
    pub fn mount_path(&self) -> String {
        let trimmed = self.url_prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            "/media".into()
        } else {
            format!("/{trimmed}")
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/data/media"),
            url_prefix: "/media".into(),
            picture_size: 300,
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}
