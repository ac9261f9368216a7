//! Application configuration management.
//!
//! Configuration is stored at `~/.config/authguard/config.json`. The API
//! root and login path can be overridden from the environment.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "authguard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_ROOT: &str = "http://localhost:8080/api";
const DEFAULT_LOGIN_PATH: &str = "/login";

pub const API_ROOT_ENV: &str = "AUTHGUARD_API_ROOT";
pub const LOGIN_PATH_ENV: &str = "AUTHGUARD_LOGIN_PATH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Keyring,
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_root: String,
    pub login_path: String,
    pub retry_unauthenticated_on_session_expiration: bool,
    pub storage: StorageKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_root: DEFAULT_API_ROOT.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            retry_unauthenticated_on_session_expiration: true,
            storage: StorageKind::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(root) = lookup(API_ROOT_ENV).filter(|v| !v.is_empty()) {
            self.api_root = root;
        }
        if let Some(path) = lookup(LOGIN_PATH_ENV).filter(|v| !v.is_empty()) {
            self.login_path = path;
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn guard_config(&self) -> GuardConfig {
        GuardConfig {
            login_path: self.login_path.clone(),
            retry_unauthenticated_on_session_expiration: self
                .retry_unauthenticated_on_session_expiration,
        }
    }
}

/// The part of the configuration the session guard needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    pub login_path: String,
    /// When false, a 401 always clears the session and retries anonymously
    pub retry_unauthenticated_on_session_expiration: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Config::default().guard_config()
    }
}

impl GuardConfig {
    pub fn logout_path(&self, session_id: &str) -> String {
        format!("{}/{}", self.login_path.trim_end_matches('/'), session_id)
    }

    pub fn reset_password_path(&self) -> String {
        format!("{}/:reset-password", self.login_path.trim_end_matches('/'))
    }
}
