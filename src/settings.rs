use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{FinError, Result};

/// Who may poll a tracking job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PollScope {
    /// Only the user who uploaded the file.
    #[default]
    Owner,
    /// Any signed-in user holding the tracking code.
    Bearer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default)]
    pub token_secret: String,
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub poll_scope: PollScope,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_token_ttl_minutes() -> i64 {
    40
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_workers() -> usize {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            token_secret: String::new(),
            token_ttl_minutes: default_token_ttl_minutes(),
            bind_addr: default_bind_addr(),
            workers: default_workers(),
            poll_scope: PollScope::default(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("fintrack.db")
    }

    pub fn session_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("session.json")
    }

    /// The signing secret, or an error when `fintrack init` has not been run.
    pub fn secret(&self) -> Result<&[u8]> {
        if self.token_secret.is_empty() {
            return Err(FinError::Settings(
                "no token secret configured; run `fintrack init` first".to_string(),
            ));
        }
        Ok(self.token_secret.as_bytes())
    }

    pub fn with_process_env(self) -> Self {
        self.apply_env(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    fn apply_env<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = var("FINTRACK_DATA_DIR") {
            self.data_dir = dir;
        }
        if let Some(secret) = var("FINTRACK_TOKEN_SECRET") {
            self.token_secret = secret;
        }
        if let Some(addr) = var("FINTRACK_BIND_ADDR") {
            self.bind_addr = addr;
        }
        self
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("fintrack")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("fintrack")
}

/// Settings as stored on disk (or defaults). No environment overrides.
/// This is what `save_settings` should be handed back.
pub fn load_file_settings() -> Settings {
    let path = settings_path();
    if !path.exists() {
        return Settings::default();
    }
    let content = std::fs::read_to_string(&path).unwrap_or_default();
    serde_json::from_str(&content).unwrap_or_default()
}

/// Effective settings: the file, with `FINTRACK_*` environment overrides.
pub fn load_settings() -> Settings {
    load_file_settings().with_process_env()
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| FinError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}
