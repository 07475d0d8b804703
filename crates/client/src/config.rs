//! Client configuration from the environment.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::query::DEFAULT_PAGE_SIZE;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_UPLOAD_CHUNK_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a number, got '{value}'")]
    NotANumber { var: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientConfig {
    pub api_url: String,
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    pub search_debounce: Duration,
    pub page_size: u32,
    pub import_poll_interval: Duration,
    pub upload_chunk_bytes: usize,
    /// How long placeholder data may show before a spinner appears.
    pub spinner_after: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_token: None,
            search_debounce: Duration::from_millis(400),
            page_size: DEFAULT_PAGE_SIZE,
            import_poll_interval: Duration::from_millis(1000),
            upload_chunk_bytes: DEFAULT_UPLOAD_CHUNK_BYTES,
            spinner_after: None,
        }
    }
}

impl ClientConfig {
    /// Read `BACKOFFICE_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("BACKOFFICE_API_URL") {
            config.api_url = url.trim().trim_end_matches('/').to_string();
        }
        config.auth_token = get("BACKOFFICE_AUTH_TOKEN");

        if let Some(ms) = number::<u64>(&get, "BACKOFFICE_SEARCH_DEBOUNCE_MS")? {
            config.search_debounce = Duration::from_millis(ms);
        }
        if let Some(size) = number::<u32>(&get, "BACKOFFICE_PAGE_SIZE")? {
            if size == 0 {
                return Err(ConfigError::Zero("BACKOFFICE_PAGE_SIZE"));
            }
            config.page_size = size;
        }
        if let Some(ms) = number::<u64>(&get, "BACKOFFICE_IMPORT_POLL_MS")? {
            if ms == 0 {
                return Err(ConfigError::Zero("BACKOFFICE_IMPORT_POLL_MS"));
            }
            config.import_poll_interval = Duration::from_millis(ms);
        }
        if let Some(bytes) = number::<usize>(&get, "BACKOFFICE_UPLOAD_CHUNK_BYTES")? {
            if bytes == 0 {
                return Err(ConfigError::Zero("BACKOFFICE_UPLOAD_CHUNK_BYTES"));
            }
            config.upload_chunk_bytes = bytes;
        }
        config.spinner_after =
            number::<u64>(&get, "BACKOFFICE_SPINNER_AFTER_MS")?.map(Duration::from_millis);

        Ok(config)
    }
}

fn number<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match get(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::NotANumber { var, value }),
    }
}
