//! Configuration data model and validation

use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint timed by the latency probe
    #[serde(default = "default_latency_url")]
    pub latency_url: String,

    /// Endpoint serving the download payload; its `bytes` query is overwritten
    #[serde(default = "default_download_url")]
    pub download_url: String,

    /// Endpoint receiving the upload payload
    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    #[serde(default = "default_download_bytes")]
    pub download_bytes: u64,

    #[serde(default = "default_upload_bytes")]
    pub upload_bytes: u64,

    /// Per-probe timeout, covering connect and body transfer
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    /// Cosmetic pause before the result is delivered
    #[serde(default = "default_result_delay_ms")]
    pub result_delay_ms: u64,

    /// Page-load time measured by the caller, in milliseconds
    #[serde(default)]
    pub page_load_ms: f64,

    /// Page to fetch and time before the pipeline runs
    #[serde(default)]
    pub page_url: Option<String>,

    /// Static connection metadata; overrides host detection when set
    #[serde(default)]
    pub network_type: Option<String>,

    #[serde(default)]
    pub connection_type: Option<String>,

    /// When false the connection capability is treated as absent
    #[serde(default = "default_connection_info")]
    pub connection_info: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Print the result record as JSON
    #[serde(default)]
    pub json_output: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            latency_url: default_latency_url(),
            download_url: default_download_url(),
            upload_url: default_upload_url(),
            download_bytes: default_download_bytes(),
            upload_bytes: default_upload_bytes(),
            timeout_seconds: default_timeout_secs(),
            result_delay_ms: default_result_delay_ms(),
            page_load_ms: 0.0,
            page_url: None,
            network_type: None,
            connection_type: None,
            connection_info: default_connection_info(),
            enable_color: default_enable_color(),
            json_output: false,
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn result_delay(&self) -> Duration {
        Duration::from_millis(self.result_delay_ms)
    }

    /// Download URL with its `bytes` query pair set to the payload size
    ///
    /// Any existing `bytes` pair is replaced; other pairs are kept.
    pub fn download_url_with_size(&self) -> Result<Url> {
        let mut url = Url::parse(&self.download_url)?;
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "bytes")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("bytes", &self.download_bytes.to_string());
        Ok(url)
    }

    /// True when static connection metadata was configured
    pub fn has_static_connection_info(&self) -> bool {
        self.network_type.is_some() || self.connection_type.is_some()
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        validate_endpoint("latency", &self.latency_url)?;
        validate_endpoint("download", &self.download_url)?;
        validate_endpoint("upload", &self.upload_url)?;

        if let Some(page_url) = &self.page_url {
            validate_endpoint("page", page_url)?;
        }

        validate_payload("Download", self.download_bytes)?;
        validate_payload("Upload", self.upload_bytes)?;

        if self.timeout_seconds == 0 {
            return Err(AppError::config("Timeout must be greater than 0"));
        }

        if self.timeout_seconds > crate::defaults::MAX_TIMEOUT_SECS {
            return Err(AppError::config(format!(
                "Timeout cannot exceed {} seconds",
                crate::defaults::MAX_TIMEOUT_SECS
            )));
        }

        if self.result_delay_ms > crate::defaults::MAX_RESULT_DELAY_MS {
            return Err(AppError::config(format!(
                "Result delay cannot exceed {} ms",
                crate::defaults::MAX_RESULT_DELAY_MS
            )));
        }

        if !self.page_load_ms.is_finite() || self.page_load_ms < 0.0 {
            return Err(AppError::config(format!(
                "Page load time must be a non-negative number, got {}",
                self.page_load_ms
            )));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("LATENCY_URL") {
            self.latency_url = url.trim().to_string();
        }

        if let Ok(url) = std::env::var("DOWNLOAD_URL") {
            self.download_url = url.trim().to_string();
        }

        if let Ok(url) = std::env::var("UPLOAD_URL") {
            self.upload_url = url.trim().to_string();
        }

        if let Ok(bytes) = std::env::var("DOWNLOAD_BYTES") {
            self.download_bytes = parse_env("DOWNLOAD_BYTES", &bytes)?;
        }

        if let Ok(bytes) = std::env::var("UPLOAD_BYTES") {
            self.upload_bytes = parse_env("UPLOAD_BYTES", &bytes)?;
        }

        if let Ok(timeout) = std::env::var("PROBE_TIMEOUT_SECONDS") {
            self.timeout_seconds = parse_env("PROBE_TIMEOUT_SECONDS", &timeout)?;
        }

        if let Ok(delay) = std::env::var("RESULT_DELAY_MS") {
            self.result_delay_ms = parse_env("RESULT_DELAY_MS", &delay)?;
        }

        if let Ok(page_load) = std::env::var("PAGE_LOAD_MS") {
            self.page_load_ms = parse_env("PAGE_LOAD_MS", &page_load)?;
        }

        if let Ok(page_url) = std::env::var("PAGE_URL") {
            self.page_url = non_empty(page_url);
        }

        if let Ok(network_type) = std::env::var("NETWORK_TYPE") {
            self.network_type = non_empty(network_type);
        }

        if let Ok(connection_type) = std::env::var("CONNECTION_TYPE") {
            self.connection_type = non_empty(connection_type);
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = parse_env("ENABLE_COLOR", &enable_color)?;
        }

        Ok(())
    }
}

fn validate_endpoint(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(AppError::config(format!("The {} URL cannot be empty", name)));
    }

    let parsed = Url::parse(value)
        .map_err(|e| AppError::config(format!("Invalid {} URL '{}': {}", name, value, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::config(format!(
            "The {} URL must use HTTP or HTTPS: {}",
            name, value
        )));
    }

    Ok(())
}

fn validate_payload(name: &str, bytes: u64) -> Result<()> {
    if bytes == 0 {
        return Err(AppError::config(format!("{} payload must be greater than 0 bytes", name)));
    }

    if bytes > crate::defaults::MAX_PAYLOAD_BYTES {
        return Err(AppError::config(format!(
            "{} payload cannot exceed {} bytes",
            name,
            crate::defaults::MAX_PAYLOAD_BYTES
        )));
    }

    Ok(())
}

fn parse_env<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, raw, e)))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// Default value functions for serde
fn default_latency_url() -> String {
    crate::defaults::DEFAULT_LATENCY_URL.to_string()
}

fn default_download_url() -> String {
    crate::defaults::DEFAULT_DOWNLOAD_URL.to_string()
}

fn default_upload_url() -> String {
    crate::defaults::DEFAULT_UPLOAD_URL.to_string()
}

fn default_download_bytes() -> u64 {
    crate::defaults::DEFAULT_DOWNLOAD_BYTES
}

fn default_upload_bytes() -> u64 {
    crate::defaults::DEFAULT_UPLOAD_BYTES
}

fn default_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_TIMEOUT.as_secs()
}

fn default_result_delay_ms() -> u64 {
    crate::defaults::DEFAULT_RESULT_DELAY.as_millis() as u64
}

fn default_connection_info() -> bool {
    true
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
