//! Configuration parsing from CLI arguments and environment variables

use crate::{cli::Cli, config::env::EnvManager, error::Result, models::Config};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    ///
    /// Layering, lowest to highest: defaults, `.env`, environment, CLI.
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file(self.cli.debug)?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);

        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    pub fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.cli;

        if let Some(page_load_ms) = cli.page_load_ms {
            config.page_load_ms = page_load_ms;
        }
        if let Some(ref page_url) = cli.page_url {
            config.page_url = Some(page_url.clone());
        }
        if let Some(timeout) = cli.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(delay_ms) = cli.delay_ms {
            config.result_delay_ms = delay_ms;
        }
        if let Some(ref url) = cli.latency_url {
            config.latency_url = url.clone();
        }
        if let Some(ref url) = cli.download_url {
            config.download_url = url.clone();
        }
        if let Some(ref url) = cli.upload_url {
            config.upload_url = url.clone();
        }
        if let Some(bytes) = cli.download_bytes {
            config.download_bytes = bytes;
        }
        if let Some(bytes) = cli.upload_bytes {
            config.upload_bytes = bytes;
        }
        if let Some(ref network_type) = cli.network_type {
            config.network_type = Some(network_type.clone());
        }
        if let Some(ref connection_type) = cli.connection_type {
            config.connection_type = Some(connection_type.clone());
        }
        if cli.no_connection_info {
            config.connection_info = false;
        }

        // An explicit flag beats ENABLE_COLOR; terminal detection does not
        if cli.color || cli.no_color || cli.json {
            config.enable_color = cli.use_colors();
        } else {
            config.enable_color = config.enable_color && cli.use_colors();
        }

        // These are CLI-only
        config.json_output = cli.json;
        config.verbose = cli.verbose;
        config.debug = cli.debug;

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
        }
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Latency URL: {}", config.latency_url));
    summary.push(format!(
        "Download URL: {} ({} bytes)",
        config.download_url, config.download_bytes
    ));
    summary.push(format!(
        "Upload URL: {} ({} bytes)",
        config.upload_url, config.upload_bytes
    ));
    summary.push(format!("Timeout: {}s", config.timeout_seconds));
    summary.push(format!("Result Delay: {}ms", config.result_delay_ms));
    match &config.page_url {
        Some(page_url) => summary.push(format!("Page URL: {}", page_url)),
        None => summary.push(format!("Page Load: {:.0}ms", config.page_load_ms)),
    }
    summary.push(format!("Connection Info: {}", config.connection_info));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("JSON Output: {}", config.json_output));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::test_env::ScopedEnv;
    use clap::Parser;

    fn overridden(args: &[&str]) -> Config {
        let mut config = Config::default();
        ConfigParser::new(Cli::parse_from(args)).apply_cli_overrides(&mut config);
        config
    }

    #[test]
    fn test_cli_flags_override_environment() {
        let env = ScopedEnv::clean();
        env.set("PROBE_TIMEOUT_SECONDS", "30");
        env.set("UPLOAD_BYTES", "2048");
        env.set("NETWORK_TYPE", "3g");

        let config = ConfigParser::new(Cli::parse_from([
            "nst",
            "--timeout", "5",
            "--network-type", "4g",
            "--no-color",
        ]))
        .parse()
        .unwrap();

        assert_eq!(config.timeout_seconds, 5);
        assert_eq!(config.network_type.as_deref(), Some("4g"));
        // Values without a flag still come from the environment
        assert_eq!(config.upload_bytes, 2048);
    }

    #[test]
    fn test_parse_reports_bad_environment_values() {
        let env = ScopedEnv::clean();
        env.set("PROBE_TIMEOUT_SECONDS", "abc");

        let result = ConfigParser::new(Cli::parse_from(["nst", "--timeout", "5"])).parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_no_flags_keep_defaults() {
        let config = overridden(&["nst", "--no-color"]);
        let defaults = Config::default();

        assert_eq!(config.latency_url, defaults.latency_url);
        assert_eq!(config.download_bytes, defaults.download_bytes);
        assert_eq!(config.timeout_seconds, defaults.timeout_seconds);
        assert_eq!(config.result_delay_ms, defaults.result_delay_ms);
        assert!(config.connection_info);
        assert!(!config.enable_color);
    }

    #[test]
    fn test_cli_overrides() {
        let config = overridden(&[
            "nst",
            "--timeout", "5",
            "--delay-ms", "0",
            "--page-load-ms", "900",
            "--download-url", "http://localhost:9000/down",
            "--download-bytes", "4096",
            "--upload-bytes", "2048",
            "--network-type", "4g",
            "--json",
            "--verbose",
        ]);

        assert_eq!(config.timeout_seconds, 5);
        assert_eq!(config.result_delay_ms, 0);
        assert_eq!(config.page_load_ms, 900.0);
        assert_eq!(config.download_url, "http://localhost:9000/down");
        assert_eq!(config.download_bytes, 4096);
        assert_eq!(config.upload_bytes, 2048);
        assert_eq!(config.network_type.as_deref(), Some("4g"));
        assert!(config.json_output);
        assert!(!config.enable_color);
        assert!(config.verbose);
        assert!(!config.debug);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_no_connection_info_flag() {
        let config = overridden(&["nst", "--no-connection-info"]);
        assert!(!config.connection_info);
    }

    #[test]
    fn test_color_flag_overrides_env_setting() {
        let mut config = Config {
            enable_color: false,
            ..Config::default()
        };
        ConfigParser::new(Cli::parse_from(["nst", "--color"])).apply_cli_overrides(&mut config);
        assert!(config.enable_color);
    }

    #[test]
    fn test_disabled_color_stays_disabled_without_flags() {
        let mut config = Config {
            enable_color: false,
            ..Config::default()
        };
        ConfigParser::new(Cli::parse_from(["nst"])).apply_cli_overrides(&mut config);
        assert!(!config.enable_color);
    }

    #[test]
    fn test_config_summary() {
        let summary = display_config_summary(&Config::default());

        assert!(summary.contains("Latency URL: https://www.cloudflare.com/cdn-cgi/trace"));
        assert!(summary.contains("(1000000 bytes)"));
        assert!(summary.contains("Timeout: 10s"));
        assert!(summary.contains("Page Load: 0ms"));
    }
}
