//! Scoring of a measurement run
//!
//! Everything in here is pure: the same inputs always produce the same
//! score. The formula is intentionally simple:
//!
//! ```text
//! ping     = max(0, 100 - latency_ms / 10)     (floor only)
//! download = clamp(download_mbps * 10, 0, 100)
//! upload   = clamp(upload_mbps * 20, 0, 100)
//! overall  = round((ping + download + upload) / 3)
//! ```
//!
//! The ping sub-score has no upper clamp. With real (non-negative) latencies
//! it never exceeds 100, but a negative latency would push it past 100 and
//! the average would carry that through. This asymmetry is kept on purpose
//! so scores stay comparable with earlier runs of the tool.

use crate::{
    models::ProbeOutcome,
    types::{NetworkTier, ProbeKind},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;


/// Smallest elapsed time used for throughput, avoiding division by zero
pub const MIN_ELAPSED: Duration = Duration::from_micros(1);

const BITS_PER_BYTE: f64 = 8.0;
const BITS_PER_MEGABIT: f64 = 1_000_000.0;

/// Convert a payload size and transfer time into megabits per second
pub fn throughput_mbps(payload_bytes: u64, elapsed: Duration) -> f64 {
    let seconds = elapsed.max(MIN_ELAPSED).as_secs_f64();
    (payload_bytes as f64 * BITS_PER_BYTE) / BITS_PER_MEGABIT / seconds
}

/// Latency in fractional milliseconds
pub fn latency_ms(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

/// Values substituted for probes that failed
///
/// The defaults are deliberately bad numbers: a failed latency probe reads
/// as a very slow one and a failed throughput probe as a near-dead link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentinelPolicy {
    pub latency_ms: f64,
    pub download_mbps: f64,
    pub upload_mbps: f64,
}

impl SentinelPolicy {
    pub const REFERENCE: SentinelPolicy = SentinelPolicy {
        latency_ms: 999.0,
        download_mbps: 0.1,
        upload_mbps: 0.1,
    };

    pub fn sentinel_for(&self, kind: ProbeKind) -> f64 {
        match kind {
            ProbeKind::Latency => self.latency_ms,
            ProbeKind::Download => self.download_mbps,
            ProbeKind::Upload => self.upload_mbps,
        }
    }

    /// Numeric value of an outcome: the measurement, or this policy's sentinel
    pub fn resolve(&self, kind: ProbeKind, outcome: &ProbeOutcome) -> f64 {
        outcome.value().unwrap_or_else(|| self.sentinel_for(kind))
    }
}

impl Default for SentinelPolicy {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// Per-metric sub-scores and the combined score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub ping_score: f64,
    pub download_score: f64,
    pub upload_score: f64,
    pub overall: u32,
}

impl ScoreBreakdown {
    pub fn from_metrics(ping_latency_ms: f64, download_mbps: f64, upload_mbps: f64) -> Self {
        let ping_score = ping_score(ping_latency_ms);
        let download_score = download_score(download_mbps);
        let upload_score = upload_score(upload_mbps);
        let average = (ping_score + download_score + upload_score) / 3.0;

        Self {
            ping_score,
            download_score,
            upload_score,
            overall: average.round() as u32,
        }
    }

    /// Score probe outcomes, substituting failures through `policy`
    pub fn from_outcomes(
        ping: &ProbeOutcome,
        download: &ProbeOutcome,
        upload: &ProbeOutcome,
        policy: &SentinelPolicy,
    ) -> Self {
        Self::from_metrics(
            policy.resolve(ProbeKind::Latency, ping),
            policy.resolve(ProbeKind::Download, download),
            policy.resolve(ProbeKind::Upload, upload),
        )
    }

    pub fn tier(&self) -> NetworkTier {
        NetworkTier::from_score(self.overall)
    }
}

/// Only floor-clamped; see the module docs
pub fn ping_score(ping_latency_ms: f64) -> f64 {
    (100.0 - ping_latency_ms / 10.0).max(0.0)
}

pub fn download_score(download_mbps: f64) -> f64 {
    (download_mbps * 10.0).clamp(0.0, 100.0)
}

pub fn upload_score(upload_mbps: f64) -> f64 {
    (upload_mbps * 20.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typical_connection() {
        let score = ScoreBreakdown::from_metrics(50.0, 20.0, 5.0);
        assert_eq!(score.ping_score, 95.0);
        assert_eq!(score.download_score, 100.0);
        assert_eq!(score.upload_score, 100.0);
        assert_eq!(score.overall, 98);
        assert_eq!(score.tier(), NetworkTier::Strong);
    }

    #[test]
    fn test_all_probes_failed() {
        let failed = ProbeOutcome::failed("connection refused");
        let score = ScoreBreakdown::from_outcomes(&failed, &failed, &failed, &SentinelPolicy::default());

        assert_eq!(score.ping_score, 0.0);
        assert!((score.download_score - 1.0).abs() < 1e-9);
        assert!((score.upload_score - 2.0).abs() < 1e-9);
        assert_eq!(score.overall, 1);
        assert_eq!(score.tier(), NetworkTier::Weak);
    }

    #[test]
    fn test_ping_score_is_only_floor_clamped() {
        assert_eq!(ping_score(5.0), 99.5);
        assert_eq!(ping_score(0.0), 100.0);
        assert_eq!(ping_score(-100.0), 110.0);
        assert_eq!(ping_score(5000.0), 0.0);

        // The excess survives averaging
        let score = ScoreBreakdown::from_metrics(-1000.0, 10.0, 5.0);
        assert_eq!(score.ping_score, 200.0);
        assert_eq!(score.overall, 133);
    }

    #[test]
    fn test_throughput_sub_scores_are_clamped() {
        assert_eq!(download_score(200.0), 100.0);
        assert_eq!(download_score(-1.0), 0.0);
        assert_eq!(upload_score(5.0), 100.0);
        assert_eq!(upload_score(2.5), 50.0);
    }

    #[test]
    fn test_throughput_reference_payloads() {
        assert_eq!(throughput_mbps(1_000_000, Duration::from_secs(2)), 4.0);
        assert_eq!(throughput_mbps(1_000_000, Duration::from_secs(1)), 8.0);
        assert_eq!(throughput_mbps(500_000, Duration::from_millis(500)), 8.0);
    }

    #[test]
    fn test_throughput_zero_elapsed_is_finite() {
        let speed = throughput_mbps(1_000_000, Duration::ZERO);
        assert!(speed.is_finite());
        assert_eq!(speed, 8.0 / MIN_ELAPSED.as_secs_f64());
    }

    #[test]
    fn test_latency_ms_keeps_sub_millisecond_precision() {
        assert_eq!(latency_ms(Duration::from_micros(1500)), 1.5);
    }

    #[test]
    fn test_custom_sentinel_policy() {
        let policy = SentinelPolicy {
            latency_ms: 2000.0,
            download_mbps: 0.0,
            upload_mbps: 0.0,
        };
        let failed = ProbeOutcome::failed("timeout");
        let measured = ProbeOutcome::measured(40.0);

        assert_eq!(policy.resolve(ProbeKind::Latency, &failed), 2000.0);
        assert_eq!(policy.resolve(ProbeKind::Latency, &measured), 40.0);

        let score = ScoreBreakdown::from_outcomes(&failed, &failed, &failed, &policy);
        assert_eq!(score.overall, 0);
    }

    #[test]
    fn test_rounding_half_goes_up() {
        // 0.5 + 100 + 0 = 100.5, average 33.5
        let score = ScoreBreakdown::from_metrics(995.0, 10.0, 0.0);
        assert_eq!(score.ping_score, 0.5);
        assert_eq!(score.overall, 34);
    }
}
