//! Command-line interface

use clap::Parser;
use std::path::PathBuf;

/// Network Strength Tester - measure latency, download and upload speed and get a 0-100 score
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "nst")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Page-load time measured beforehand, in milliseconds
    #[arg(long, value_name = "MS", value_parser = parse_page_load)]
    pub page_load_ms: Option<f64>,

    /// Measure page load by fetching this page before the probes run
    #[arg(long, value_name = "URL")]
    pub page_url: Option<String>,

    /// Per-probe timeout in seconds
    #[arg(short, long, value_name = "SECS", value_parser = parse_duration)]
    pub timeout: Option<u64>,

    /// Pause before the result is shown, in milliseconds
    #[arg(long, value_name = "MS", value_parser = parse_delay_ms)]
    pub delay_ms: Option<u64>,

    /// Latency probe endpoint
    #[arg(long, value_name = "URL")]
    pub latency_url: Option<String>,

    /// Download probe endpoint (the `bytes` query is set automatically)
    #[arg(long, value_name = "URL")]
    pub download_url: Option<String>,

    /// Upload probe endpoint
    #[arg(long, value_name = "URL")]
    pub upload_url: Option<String>,

    /// Download payload size in bytes
    #[arg(long, value_name = "BYTES", value_parser = parse_payload_bytes)]
    pub download_bytes: Option<u64>,

    /// Upload payload size in bytes
    #[arg(long, value_name = "BYTES", value_parser = parse_payload_bytes)]
    pub upload_bytes: Option<u64>,

    /// Report this network type (e.g. 4g) instead of detecting it
    #[arg(long, value_name = "TYPE")]
    pub network_type: Option<String>,

    /// Report this connection type (e.g. wifi) instead of detecting it
    #[arg(long, value_name = "TYPE")]
    pub connection_type: Option<String>,

    /// Do not look up connection metadata
    #[arg(long)]
    pub no_connection_info: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Show the score breakdown and probe details
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// List supported environment variables and exit
    #[arg(long)]
    pub env_help: bool,

    /// Write a commented example .env file to PATH and exit
    #[arg(long, value_name = "PATH")]
    pub write_env_example: Option<PathBuf>,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.page_load_ms.is_some() && self.page_url.is_some() {
            return Err("Cannot specify both --page-load-ms and --page-url".to_string());
        }

        if self.no_connection_info && (self.network_type.is_some() || self.connection_type.is_some()) {
            return Err(
                "--no-connection-info cannot be combined with --network-type or --connection-type".to_string(),
            );
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color || self.json {
            false
        } else {
            supports_color()
        }
    }
}

/// Parse duration from seconds string
fn parse_duration(s: &str) -> Result<u64, String> {
    // Reject strings with leading + sign or other invalid formats
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if secs > crate::defaults::MAX_TIMEOUT_SECS {
                Err(format!(
                    "Duration cannot exceed {} seconds",
                    crate::defaults::MAX_TIMEOUT_SECS
                ))
            } else {
                Ok(secs)
            }
        })
}

fn parse_delay_ms(s: &str) -> Result<u64, String> {
    s.parse::<u64>()
        .map_err(|_| format!("Invalid delay: {}", s))
        .and_then(|ms| {
            if ms > crate::defaults::MAX_RESULT_DELAY_MS {
                Err(format!(
                    "Delay cannot exceed {} ms",
                    crate::defaults::MAX_RESULT_DELAY_MS
                ))
            } else {
                Ok(ms)
            }
        })
}

fn parse_payload_bytes(s: &str) -> Result<u64, String> {
    s.parse::<u64>()
        .map_err(|_| format!("Invalid byte count: {}", s))
        .and_then(|bytes| {
            if bytes == 0 {
                Err("Payload must be at least 1 byte".to_string())
            } else if bytes > crate::defaults::MAX_PAYLOAD_BYTES {
                Err(format!(
                    "Payload cannot exceed {} bytes",
                    crate::defaults::MAX_PAYLOAD_BYTES
                ))
            } else {
                Ok(bytes)
            }
        })
}

fn parse_page_load(s: &str) -> Result<f64, String> {
    s.parse::<f64>()
        .map_err(|_| format!("Invalid page load time: {}", s))
        .and_then(|ms| {
            if !ms.is_finite() || ms < 0.0 {
                Err("Page load time must be a non-negative number".to_string())
            } else {
                Ok(ms)
            }
        })
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
