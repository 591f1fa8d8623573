//! Network Strength Tester
//!
//! Estimates end-user network quality by running a short, strictly sequential
//! measurement pipeline: a latency probe, a download probe and an upload probe.
//! The three timings are combined into a 0-100 score with a qualitative tier
//! and a handful of recommendations.

pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod scoring;
pub mod types;

// Re-export commonly used types
pub use client::{HttpProbeClient, ProbeClient};
pub use connection::{ConnectionInfo, ConnectionInfoProvider};
pub use error::{AppError, Result};
pub use models::{Config, MeasurementResult, ProbeOutcome, ProbeSample};
pub use pipeline::{MeasurementPipeline, StepEvent, StepEvents};
pub use scoring::{ScoreBreakdown, SentinelPolicy};
pub use types::{NetworkTier, ProbeKind, TestStep};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
pub const BUILD_TIME: &str = env!("BUILD_TIME");

/// Name, version and build metadata for debug output
pub fn version_banner() -> String {
    match option_env!("GIT_COMMIT") {
        Some(commit) => format!("{} v{} ({}, built {})", PKG_NAME, VERSION, commit, BUILD_TIME),
        None => format!("{} v{} (built {})", PKG_NAME, VERSION, BUILD_TIME),
    }
}

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_LATENCY_URL: &str = "https://www.cloudflare.com/cdn-cgi/trace";
    pub const DEFAULT_DOWNLOAD_URL: &str = "https://speed.cloudflare.com/__down";
    pub const DEFAULT_UPLOAD_URL: &str = "https://httpbin.org/post";

    /// 1 MB download, i.e. 8 megabits
    pub const DEFAULT_DOWNLOAD_BYTES: u64 = 1_000_000;
    /// 500 KB upload, i.e. 4 megabits
    pub const DEFAULT_UPLOAD_BYTES: u64 = 500_000;
    pub const MAX_PAYLOAD_BYTES: u64 = 100_000_000;

    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const MAX_TIMEOUT_SECS: u64 = 300;

    /// Pause before the result is handed over; purely cosmetic
    pub const DEFAULT_RESULT_DELAY: Duration = Duration::from_millis(1000);
    pub const MAX_RESULT_DELAY_MS: u64 = 10_000;

    pub const DEFAULT_ENABLE_COLOR: bool = true;

    pub const USER_AGENT: &str = concat!("network-strength-tester/", env!("CARGO_PKG_VERSION"));
}
