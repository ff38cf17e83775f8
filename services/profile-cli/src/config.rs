//! Configuration types and loading
//!
//! Precedence: env vars > config file > defaults. The config file is
//! optional unless named explicitly with `--config` or
//! `PROFILE_SESSION_CONFIG`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use session::SessionConfig;
use token_auth::{DEFAULT_BASE_URL, FileTokenStore, MemoryTokenStore, TokenStore};

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote API settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_secs: u64,
}

/// Where the access token is kept between runs
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
    /// `false` keeps the token in memory for a single run only
    #[serde(default = "default_persist")]
    pub persist: bool,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_refresh_timeout() -> u64 {
    10
}

fn default_token_path() -> PathBuf {
    PathBuf::from(".profile-session").join("token.json")
}

fn default_persist() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            refresh_timeout_secs: default_refresh_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            token_path: default_token_path(),
            persist: default_persist(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// A missing file is an error only when `required` is set; otherwise the
    /// defaults are used.
    pub fn load(path: &Path, required: bool) -> common::Result<Self> {
        let mut config: Config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => Config::default(),
            Err(e) => return Err(e.into()),
        };

        if let Ok(url) = std::env::var("PROFILE_API_URL") {
            config.api.base_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.api.refresh_timeout_secs == 0 {
            return Err(common::Error::Config(
                "refresh_timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or PROFILE_SESSION_CONFIG env var.
    ///
    /// The flag reports whether the path was chosen explicitly (and so must exist).
    pub fn resolve_path(cli_path: Option<&str>) -> (PathBuf, bool) {
        if let Some(p) = cli_path {
            return (PathBuf::from(p), true);
        }
        if let Ok(p) = std::env::var("PROFILE_SESSION_CONFIG") {
            return (PathBuf::from(p), true);
        }
        (PathBuf::from("profile-session.toml"), false)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            base_url: self.api.base_url.clone(),
            request_timeout: Duration::from_secs(self.api.timeout_secs),
            refresh_timeout: Duration::from_secs(self.api.refresh_timeout_secs),
        }
    }

    pub fn token_store(&self) -> Arc<dyn TokenStore> {
        if self.storage.persist {
            Arc::new(FileTokenStore::open(&self.storage.token_path))
        } else {
            Arc::new(MemoryTokenStore::new())
        }
    }
}
