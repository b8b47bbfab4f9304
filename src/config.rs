//! Process-wide service configuration.
//!
//! The base address is fixed at deploy time. Keys resolve from the process
//! environment first, then a `.env` file, then the bundled
//! `assets/config.env`. Nothing here writes to the environment, so loading is
//! safe from any thread.

use once_cell::sync::{Lazy, OnceCell};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConfigError;

/// Bundled config for builds that ship without a `.env` file
const BUNDLED_CONFIG: &str = include_str!("../assets/config.env");

pub const BASE_URL_VAR: &str = "LEUKODETECT_API_BASE_URL";
pub const TIMEOUT_VAR: &str = "LEUKODETECT_REQUEST_TIMEOUT_SECS";
pub const LOG_VAR: &str = "LEUKODETECT_LOG";

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

static CONFIG: OnceCell<ServiceConfig> = OnceCell::new();
static LAYERS: Lazy<ConfigLayers> = Lazy::new(ConfigLayers::load);

#[derive(Clone, Debug, PartialEq)]
pub struct ServiceConfig {
    base_url: String,
    timeout: Duration,
}

impl ServiceConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build from the environment, `.env` and bundled defaults, in that order.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_value)
    }

    /// Build from an arbitrary key lookup; missing keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(&base_url)?;

        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidTimeout(raw.clone()))?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Resolve once and return the shared config.
    pub fn global() -> Result<&'static ServiceConfig, ConfigError> {
        CONFIG.get_or_try_init(Self::from_env)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let url = reqwest::Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl {
        value: trimmed.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            value: trimmed.to_string(),
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Look up `key` in the environment, then `.env`, then the bundled config.
pub fn env_value(key: &str) -> Option<String> {
    LAYERS.resolve(key, |key| std::env::var(key).ok())
}

/// File-backed layers read once per process.
#[derive(Debug, Default)]
struct ConfigLayers {
    dotenv: HashMap<String, String>,
    bundled: HashMap<String, String>,
}

impl ConfigLayers {
    fn load() -> Self {
        Self {
            dotenv: read_dotenv(),
            bundled: parse_env_lines(BUNDLED_CONFIG)
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }

    fn resolve(&self, key: &str, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        env(key)
            .or_else(|| self.dotenv.get(key).cloned())
            .or_else(|| self.bundled.get(key).cloned())
    }
}

// A missing `.env` is normal outside desktop dev; unreadable lines are skipped.
fn read_dotenv() -> HashMap<String, String> {
    match dotenvy::dotenv_iter() {
        Ok(iter) => iter.filter_map(Result::ok).collect(),
        Err(_) => HashMap::new(),
    }
}

fn parse_env_lines(source: &str) -> impl Iterator<Item = (&str, &str)> {
    source.lines().filter_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (key, value) = line.split_once('=')?;
        Some((key.trim(), value.trim()))
    })
}
