//! Colored formatter implementation with terminal color support
//!
//! Lays the result out the same way as [`PlainFormatter`](super::PlainFormatter)
//! and adds tier colors, per-metric coloring and symbols.

use crate::{
    error::{AppError, Result},
    models::MeasurementResult,
    pipeline::StepEvent,
    types::{NetworkTier, TestStep},
};
use super::formatter::{step_line, FormattingOptions, ResultFormatter, ResultLines};
use colored::*;
use std::fmt::Write as _;

/// Quality band of a single sub-score, used for coloring
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PerformanceLevel {
    Good,  // >= 80
    Fair,  // >= 50
    Poor,
}

impl PerformanceLevel {
    /// Bands follow the tier thresholds
    pub fn from_score(score: f64) -> Self {
        if score >= NetworkTier::STRONG_THRESHOLD as f64 {
            Self::Good
        } else if score >= NetworkTier::MODERATE_THRESHOLD as f64 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Good => Color::Green,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Red,
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub warning: Color,
    pub info: Color,
    pub muted: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            warning: Color::Yellow,
            info: Color::Cyan,
            muted: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            options,
            color_scheme: ColorScheme::default(),
        }
    }

    /// Create a colored formatter with custom color scheme
    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        Self { options, color_scheme }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    /// Apply bold formatting if colors are enabled
    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    /// Bold and colored if colors are enabled
    fn heading(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.bold().color(color)
        } else {
            text.normal()
        }
    }

    fn tier_color(tier: NetworkTier) -> Color {
        match tier {
            NetworkTier::Strong => Color::Green,
            NetworkTier::Moderate => Color::Yellow,
            NetworkTier::Weak => Color::Red,
        }
    }

    fn tier_symbol(tier: NetworkTier) -> &'static str {
        match tier {
            NetworkTier::Strong => "●●●",
            NetworkTier::Moderate => "●●○",
            NetworkTier::Weak => "●○○",
        }
    }

    /// Sub-score driving the color of each metric row, by row position
    fn row_score(result: &MeasurementResult, row: usize) -> Option<f64> {
        let score = result.score();
        match row {
            0 => Some(score.ping_score),
            1 => Some(score.download_score),
            2 => Some(score.upload_score),
            _ => None,
        }
    }
}

fn format_error(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format result: {}", e))
}

impl ResultFormatter for ColoredFormatter {
    fn format_step(&self, event: &StepEvent) -> String {
        let line = step_line(event);
        if event.step == TestStep::Complete {
            self.colorize(&line, Color::Green).to_string()
        } else {
            self.colorize(&line, self.color_scheme.info).to_string()
        }
    }

    fn format_result(&self, result: &MeasurementResult) -> Result<String> {
        let lines = ResultLines::from_result(result);
        let tier = result.tier();
        let width = self.options.label_width;
        let mut output = String::new();

        writeln!(
            output,
            "{} {}",
            self.colorize(Self::tier_symbol(tier), Self::tier_color(tier)),
            self.heading(&lines.headline, Self::tier_color(tier))
        )
        .map_err(format_error)?;
        writeln!(output, "{}", self.bold(&lines.score)).map_err(format_error)?;
        writeln!(output).map_err(format_error)?;

        for (row, (label, value)) in lines.metrics.iter().enumerate() {
            let value = match Self::row_score(result, row) {
                Some(score) => self.colorize(value, PerformanceLevel::from_score(score).color()),
                None => value.normal(),
            };
            writeln!(
                output,
                "{}{}",
                self.colorize(&format!("{:<width$}", label, width = width), self.color_scheme.muted),
                value
            )
            .map_err(format_error)?;
        }

        if self.options.verbose_mode {
            writeln!(output).map_err(format_error)?;
            writeln!(output, "{}", self.heading("Score Breakdown:", self.color_scheme.header))
                .map_err(format_error)?;
            for (label, value) in &lines.breakdown {
                writeln!(output, "  {:<width$}{}", label, value, width = width).map_err(format_error)?;
            }
            for failure in &lines.failures {
                writeln!(output, "  {}", self.colorize(failure, self.color_scheme.warning))
                    .map_err(format_error)?;
            }
        }

        writeln!(output).map_err(format_error)?;
        writeln!(output, "{}", self.heading("Recommendations:", self.color_scheme.header))
            .map_err(format_error)?;
        for recommendation in &lines.recommendations {
            writeln!(output, "  {}", recommendation).map_err(format_error)?;
        }

        if let Some(page_load) = &lines.page_load {
            writeln!(output).map_err(format_error)?;
            writeln!(output, "{}", self.colorize(page_load, self.color_scheme.muted)).map_err(format_error)?;
        }

        Ok(output)
    }

    fn format_warning(&self, warning: &str) -> String {
        format!(
            "{} {}",
            self.heading("Warning:", self.color_scheme.warning),
            warning
        )
    }
}
