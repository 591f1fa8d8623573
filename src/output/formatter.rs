//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface and provides
//! the plain text and JSON implementations.

use crate::{
    error::{AppError, Result},
    models::MeasurementResult,
    pipeline::StepEvent,
    types::ProbeKind,
};
use std::fmt::Write as _;

/// Shown when the platform could not report a connection property
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Main trait for output formatting
pub trait ResultFormatter: Send + Sync {
    /// Format one progress notification
    fn format_step(&self, event: &StepEvent) -> String;

    /// Format the final measurement record
    fn format_result(&self, result: &MeasurementResult) -> Result<String>;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> String;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Show the score breakdown and probe failures
    pub verbose_mode: bool,
    /// Width of the label column
    pub label_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            label_width: 16,
        }
    }
}

/// Text of every line the human-readable renderers print, before styling
pub(crate) struct ResultLines {
    pub headline: String,
    pub score: String,
    pub metrics: Vec<(&'static str, String)>,
    pub recommendations: Vec<String>,
    pub page_load: Option<String>,
    pub breakdown: Vec<(&'static str, String)>,
    pub failures: Vec<String>,
}

impl ResultLines {
    pub fn from_result(result: &MeasurementResult) -> Self {
        let score = result.score();
        let tier = result.tier();

        let metrics = vec![
            ("Response Time", metric_text(result, ProbeKind::Latency)),
            ("Download", metric_text(result, ProbeKind::Download)),
            ("Upload", metric_text(result, ProbeKind::Upload)),
            ("Network Type", or_unknown(result.network_type())),
            ("Connection", or_unknown(result.connection_type())),
        ];

        let recommendations = tier
            .recommendations()
            .iter()
            .enumerate()
            .map(|(index, text)| format!("{}. {}", index + 1, text))
            .collect();

        let page_load = (result.page_load_time_ms() > 0.0).then(|| {
            format!(
                "Initial page load time: {:.2}s",
                result.page_load_time_ms() / 1000.0
            )
        });

        let breakdown = vec![
            ("Ping score", format!("{:.1}", score.ping_score)),
            ("Download score", format!("{:.1}", score.download_score)),
            ("Upload score", format!("{:.1}", score.upload_score)),
        ];

        let failures = result
            .failed_probes()
            .into_iter()
            .map(|kind| {
                let reason = result.outcome(kind).failure_reason().unwrap_or("unknown error");
                format!(
                    "{} probe failed: {} (scored as {} {})",
                    kind,
                    reason,
                    result.sentinel_policy().sentinel_for(kind),
                    kind.unit()
                )
            })
            .collect();

        Self {
            headline: format!("{} Network", tier),
            score: format!("Score: {}/100", score.overall),
            metrics,
            recommendations,
            page_load,
            breakdown,
            failures,
        }
    }
}

/// Metric value as displayed, with failed probes showing their substitute
pub(crate) fn metric_text(result: &MeasurementResult, kind: ProbeKind) -> String {
    match kind {
        ProbeKind::Latency => format!("{:.0} ms", result.ping_latency_ms()),
        ProbeKind::Download => format!("{:.1} Mbps", result.download_mbps()),
        ProbeKind::Upload => format!("{:.1} Mbps", result.upload_mbps()),
    }
}

fn or_unknown(value: &str) -> String {
    if value.trim().is_empty() {
        UNKNOWN_LABEL.to_string()
    } else {
        value.to_string()
    }
}

/// Render a step event as `[ 30%] Testing download speed...`
pub fn step_line(event: &StepEvent) -> String {
    format!("[{:>3}%] {}", event.progress_percent, event.status_text)
}

fn format_error(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format result: {}", e))
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormattingOptions {
        &self.options
    }
}

impl ResultFormatter for PlainFormatter {
    fn format_step(&self, event: &StepEvent) -> String {
        step_line(event)
    }

    fn format_result(&self, result: &MeasurementResult) -> Result<String> {
        let lines = ResultLines::from_result(result);
        let width = self.options.label_width;
        let mut output = String::new();

        writeln!(output, "{}", lines.headline).map_err(format_error)?;
        writeln!(output, "{}", lines.score).map_err(format_error)?;
        writeln!(output).map_err(format_error)?;

        for (label, value) in &lines.metrics {
            writeln!(output, "{:<width$}{}", label, value, width = width).map_err(format_error)?;
        }

        if self.options.verbose_mode {
            writeln!(output).map_err(format_error)?;
            writeln!(output, "Score Breakdown:").map_err(format_error)?;
            for (label, value) in &lines.breakdown {
                writeln!(output, "  {:<width$}{}", label, value, width = width).map_err(format_error)?;
            }
            for failure in &lines.failures {
                writeln!(output, "  {}", failure).map_err(format_error)?;
            }
        }

        writeln!(output).map_err(format_error)?;
        writeln!(output, "Recommendations:").map_err(format_error)?;
        for recommendation in &lines.recommendations {
            writeln!(output, "  {}", recommendation).map_err(format_error)?;
        }

        if let Some(page_load) = &lines.page_load {
            writeln!(output).map_err(format_error)?;
            writeln!(output, "{}", page_load).map_err(format_error)?;
        }

        Ok(output)
    }

    fn format_warning(&self, warning: &str) -> String {
        format!("Warning: {}", warning)
    }
}

/// Machine-readable formatter; the record uses camelCase keys
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ResultFormatter for JsonFormatter {
    fn format_step(&self, event: &StepEvent) -> String {
        serde_json::to_string(event).unwrap_or_else(|_| step_line(event))
    }

    fn format_result(&self, result: &MeasurementResult) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(result)?
        } else {
            serde_json::to_string(result)?
        };
        Ok(json)
    }

    fn format_warning(&self, warning: &str) -> String {
        serde_json::json!({ "warning": warning }).to_string()
    }
}
