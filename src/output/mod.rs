//! Output formatting and display system
//!
//! Step events and the final record are rendered as plain text, colored
//! text or JSON. Step lines are meant for stderr and the record for stdout.

mod colored;
mod formatter;

pub use colored::{ColorScheme, ColoredFormatter, PerformanceLevel};
pub use formatter::{
    step_line, FormattingOptions, JsonFormatter, PlainFormatter, ResultFormatter, UNKNOWN_LABEL,
};

use crate::models::Config;

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn ResultFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            ..FormattingOptions::default()
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    /// Pick the formatter the configuration asks for
    pub fn from_config(config: &Config) -> Box<dyn ResultFormatter> {
        if config.json_output {
            Box::new(JsonFormatter::default())
        } else {
            Self::create_formatter(config.enable_color, config.verbose)
        }
    }

    /// Create a plain text formatter for scripts/logs
    pub fn create_plain_formatter() -> Box<dyn ResultFormatter> {
        Self::create_formatter(false, false)
    }
}
