//! Main application orchestration and execution

use crate::{
    cli::Cli,
    client::HttpProbeClient,
    config::{display_config_summary, load_config, EnvManager},
    connection::provider_for,
    error::Result,
    logging::LoggerFactory,
    models::{Config, MeasurementResult},
    output::{OutputFormatterFactory, ResultFormatter},
    pipeline::{MeasurementPipeline, PipelineOptions},
};
use std::{path::Path, sync::Arc};

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the application: one measurement, rendered to the terminal
    pub async fn run(self) -> Result<()> {
        if self.cli.env_help {
            println!("{}", EnvManager::display_env_help());
            return Ok(());
        }

        if let Some(path) = &self.cli.write_env_example {
            EnvManager::save_example_env_file(path)?;
            println!("Wrote example configuration to {}", path.display());
            return Ok(());
        }

        let config = load_config(self.cli)?;

        if config.debug {
            eprintln!("{}", crate::version_banner());
            eprintln!("\nConfiguration Summary:");
            eprintln!("{}\n", display_config_summary(&config));
            for warning in EnvManager::validate_current_env() {
                eprintln!("{}", warning);
            }
            if let Some(warnings) = EnvManager::check_env_file(Path::new(".env"))? {
                for warning in warnings {
                    eprintln!(".env: {}", warning);
                }
            }
        }

        let formatter = OutputFormatterFactory::from_config(&config);
        let result = measure(&config, formatter.as_ref()).await?;

        let output = formatter.format_result(&result)?;
        println!("{}", output.trim_end());

        Ok(())
    }
}

/// Run the pipeline for `config`, streaming step lines to stderr
pub async fn measure(config: &Config, formatter: &dyn ResultFormatter) -> Result<MeasurementResult> {
    let loggers = LoggerFactory::new(config.clone());
    let logger = loggers.create_logger("pipeline").await;
    let client = HttpProbeClient::new(config, loggers.create_probe_logger().await)?;

    let page_load_ms = match &config.page_url {
        Some(page_url) => match client.measure_page_load(page_url).await {
            Ok(ms) => ms,
            Err(e) => {
                eprintln!(
                    "{}",
                    formatter.format_warning(&format!("Page load measurement failed: {}", e))
                );
                config.page_load_ms
            }
        },
        None => config.page_load_ms,
    };

    let mut pipeline = MeasurementPipeline::new(
        Arc::new(client),
        provider_for(config),
        PipelineOptions::from_config(config),
        logger,
    );
    let events = pipeline.take_events();

    let render = async {
        if let Some(mut events) = events {
            while let Some(event) = events.next().await {
                eprintln!("{}", formatter.format_step(&event));
            }
        }
    };

    let (result, ()) = tokio::join!(pipeline.run(page_load_ms), render);
    Ok(result)
}
