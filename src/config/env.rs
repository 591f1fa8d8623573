//! Environment variable handling and .env file management

use crate::{
    error::{AppError, Result},
    logging::LogLevel,
};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env from the current directory if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file; a missing file is not an error
    ///
    /// Variables already present in the process environment are kept.
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No {} file found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        let mut content = String::from(
            "# Network Strength Tester Configuration\n\
             #\n\
             # Values here act as defaults and can be overridden by real environment\n\
             # variables and by command-line arguments.\n\n",
        );

        for (var, description, example) in Self::get_supported_env_vars() {
            content.push_str(&format!("# {}\n# {}={}\n\n", description, var, example));
        }

        content
    }

    /// Save example .env file to disk; an existing file is left alone
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(AppError::config(format!(
                "{} already exists; remove it or pick another path",
                path.display()
            )));
        }

        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();

        match key {
            "LATENCY_URL" | "DOWNLOAD_URL" | "UPLOAD_URL" | "PAGE_URL" => {
                let parsed = url::Url::parse(value)
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(AppError::config(format!("{} must use HTTP or HTTPS: {}", key, value)));
                }
            }
            "DOWNLOAD_BYTES" | "UPLOAD_BYTES" => {
                let bytes: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if bytes == 0 || bytes > crate::defaults::MAX_PAYLOAD_BYTES {
                    return Err(AppError::config(format!(
                        "{} must be between 1 and {}, got: {}",
                        key,
                        crate::defaults::MAX_PAYLOAD_BYTES,
                        bytes
                    )));
                }
            }
            "PROBE_TIMEOUT_SECONDS" => {
                let timeout: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if timeout == 0 || timeout > crate::defaults::MAX_TIMEOUT_SECS {
                    return Err(AppError::config(format!(
                        "{} must be between 1 and {}, got: {}",
                        key,
                        crate::defaults::MAX_TIMEOUT_SECS,
                        timeout
                    )));
                }
            }
            "RESULT_DELAY_MS" => {
                let delay: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if delay > crate::defaults::MAX_RESULT_DELAY_MS {
                    return Err(AppError::config(format!(
                        "{} cannot exceed {}, got: {}",
                        key,
                        crate::defaults::MAX_RESULT_DELAY_MS,
                        delay
                    )));
                }
            }
            "PAGE_LOAD_MS" => {
                let page_load: f64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if !page_load.is_finite() || page_load < 0.0 {
                    return Err(AppError::config(format!("{} must be a non-negative number", key)));
                }
            }
            "ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            "LOG_LEVEL" => {
                value.parse::<LogLevel>()?;
            }
            _ => {
                // Free-form or unknown variable
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("LATENCY_URL", "Endpoint timed by the latency probe", crate::defaults::DEFAULT_LATENCY_URL),
            ("DOWNLOAD_URL", "Endpoint serving the download payload", crate::defaults::DEFAULT_DOWNLOAD_URL),
            ("UPLOAD_URL", "Endpoint receiving the upload payload", crate::defaults::DEFAULT_UPLOAD_URL),
            ("DOWNLOAD_BYTES", "Download payload size in bytes", "1000000"),
            ("UPLOAD_BYTES", "Upload payload size in bytes", "500000"),
            ("PROBE_TIMEOUT_SECONDS", "Per-probe timeout in seconds (1-300)", "10"),
            ("RESULT_DELAY_MS", "Pause before the result is shown (0-10000)", "1000"),
            ("PAGE_LOAD_MS", "Page-load time measured beforehand", "0"),
            ("PAGE_URL", "Page to fetch and time before the probes", "https://example.com/"),
            ("NETWORK_TYPE", "Static network type", "4g"),
            ("CONNECTION_TYPE", "Static connection type", "wifi"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
            ("LOG_LEVEL", "Log level (trace, debug, info, warn, error)", "warn"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<22} {}\n", var, description));
            help.push_str(&format!("  {:<22} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(var_name, _, _)| {
                let value = std::env::var(var_name).ok()?;
                Self::validate_env_var(var_name, &value)
                    .err()
                    .map(|e| format!("Warning: {}", e))
            })
            .collect()
    }

    /// Validate the entries of an env file without loading it
    pub fn check_env_file(path: &Path) -> Result<Option<Vec<String>>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read {}: {}", path.display(), e)))?;

        let mut warnings = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().trim_matches('"');
                if let Err(e) = Self::validate_env_var(key.trim(), value) {
                    warnings.push(format!("Line '{}': {}", line, e));
                }
            }
        }

        Ok(Some(warnings))
    }
}
