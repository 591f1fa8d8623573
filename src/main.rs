//! Network Strength Tester - Main CLI Application
//!
//! Runs one latency/download/upload measurement and prints a 0-100 score
//! with a tier and recommendations.

use clap::Parser;
use network_strength_tester::{
    app::App,
    cli::Cli,
    error::{AppError, ErrorReporter},
};
use std::{error::Error, process};

#[tokio::main]
async fn main() {
    // Set up better panic handling
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        eprintln!("This is a bug; please report it together with the command line you used.");
        process::exit(AppError::internal("panic").exit_code());
    }));

    let cli = Cli::parse();

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        process::exit(1);
    }

    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose);

    if let Err(e) = App::new(cli).run().await {
        reporter.report_error(&e);

        if let Some(source) = e.source() {
            eprintln!("Caused by: {}", source);
        }

        print_error_suggestions(&e);

        process::exit(e.exit_code());
    }
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) | AppError::Validation(_) | AppError::Parse(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format (see --env-help)");
            eprintln!("  - Endpoint URLs must start with http:// or https://");
            eprintln!("  - Payload sizes must be between 1 and 100000000 bytes");
            eprintln!("  - Timeouts must be between 1 and 300 seconds");
        }
        AppError::Network(_) | AppError::HttpRequest(_) | AppError::Timeout(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check your internet connection");
            eprintln!("  - Increase the probe timeout with --timeout");
            eprintln!("  - Try different endpoints with --latency-url, --download-url or --upload-url");
        }
        _ => {}
    }
}
