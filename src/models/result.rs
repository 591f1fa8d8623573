//! Probe samples, probe outcomes and the final measurement record

use crate::{
    scoring::{ScoreBreakdown, SentinelPolicy},
    types::{NetworkTier, ProbeKind},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;
use uuid::Uuid;

/// Raw observation from one completed probe request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSample {
    /// Wall-clock time from request start to completion
    pub elapsed: Duration,
    /// Nominal payload size the throughput is computed from
    pub payload_bytes: u64,
    /// Bytes actually moved (body bytes read, or request body sent)
    pub transferred_bytes: u64,
    /// HTTP status of the response, if one arrived
    pub status: Option<u16>,
}

impl ProbeSample {
    pub fn new(elapsed: Duration, payload_bytes: u64) -> Self {
        Self {
            elapsed,
            payload_bytes,
            transferred_bytes: payload_bytes,
            status: None,
        }
    }

    pub fn with_transferred(mut self, transferred_bytes: u64) -> Self {
        self.transferred_bytes = transferred_bytes;
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Result of a single probe: a measured value, or a failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProbeOutcome {
    Measured { value: f64 },
    Failed { reason: String },
}

impl ProbeOutcome {
    pub fn measured(value: f64) -> Self {
        Self::Measured { value }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed { reason: reason.into() }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Measured { value } => Some(*value),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_measured(&self) -> bool {
        matches!(self, Self::Measured { .. })
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Measured { .. } => None,
            Self::Failed { reason } => Some(reason),
        }
    }

    /// Negative or non-finite measurements are demoted to failures
    fn sanitized(self) -> Self {
        match self {
            Self::Measured { value } if !value.is_finite() || value < 0.0 => {
                Self::failed(format!("invalid measurement: {}", value))
            }
            other => other,
        }
    }
}

/// Immutable record produced by one pipeline run
///
/// The overall score is computed in the constructor from the three probe
/// outcomes, so it can never disagree with them.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementResult {
    session_id: String,
    measured_at: DateTime<Utc>,
    page_load_time_ms: f64,
    ping: ProbeOutcome,
    download: ProbeOutcome,
    upload: ProbeOutcome,
    network_type: String,
    connection_type: String,
    policy: SentinelPolicy,
    score: ScoreBreakdown,
}

impl MeasurementResult {
    pub fn new(
        page_load_time_ms: f64,
        ping: ProbeOutcome,
        download: ProbeOutcome,
        upload: ProbeOutcome,
        network_type: impl Into<String>,
        connection_type: impl Into<String>,
        policy: SentinelPolicy,
    ) -> Self {
        let ping = ping.sanitized();
        let download = download.sanitized();
        let upload = upload.sanitized();
        let score = ScoreBreakdown::from_outcomes(&ping, &download, &upload, &policy);

        let page_load_time_ms = if page_load_time_ms.is_finite() {
            page_load_time_ms.max(0.0)
        } else {
            0.0
        };

        Self {
            session_id: Uuid::new_v4().to_string(),
            measured_at: Utc::now(),
            page_load_time_ms,
            ping,
            download,
            upload,
            network_type: network_type.into(),
            connection_type: connection_type.into(),
            policy,
            score,
        }
    }

    /// Attach the logging session id so logs and records line up
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn measured_at(&self) -> DateTime<Utc> {
        self.measured_at
    }

    pub fn page_load_time_ms(&self) -> f64 {
        self.page_load_time_ms
    }

    pub fn ping_latency_ms(&self) -> f64 {
        self.policy.resolve(ProbeKind::Latency, &self.ping)
    }

    pub fn download_mbps(&self) -> f64 {
        self.policy.resolve(ProbeKind::Download, &self.download)
    }

    pub fn upload_mbps(&self) -> f64 {
        self.policy.resolve(ProbeKind::Upload, &self.upload)
    }

    pub fn outcome(&self, kind: ProbeKind) -> &ProbeOutcome {
        match kind {
            ProbeKind::Latency => &self.ping,
            ProbeKind::Download => &self.download,
            ProbeKind::Upload => &self.upload,
        }
    }

    pub fn network_type(&self) -> &str {
        &self.network_type
    }

    pub fn connection_type(&self) -> &str {
        &self.connection_type
    }

    pub fn sentinel_policy(&self) -> &SentinelPolicy {
        &self.policy
    }

    pub fn score(&self) -> &ScoreBreakdown {
        &self.score
    }

    pub fn overall_score(&self) -> u32 {
        self.score.overall
    }

    pub fn tier(&self) -> NetworkTier {
        self.score.tier()
    }

    pub fn failed_probes(&self) -> Vec<ProbeKind> {
        [ProbeKind::Latency, ProbeKind::Download, ProbeKind::Upload]
            .into_iter()
            .filter(|kind| !self.outcome(*kind).is_measured())
            .collect()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidityFlags {
    ping_latency: bool,
    download_speed: bool,
    upload_speed: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResultReport<'a> {
    page_load_time: f64,
    ping_latency: f64,
    download_speed: f64,
    upload_speed: f64,
    network_type: &'a str,
    connection_type: &'a str,
    overall_score: u32,
    tier: NetworkTier,
    valid: ValidityFlags,
    score_breakdown: &'a ScoreBreakdown,
    session_id: &'a str,
    measured_at: DateTime<Utc>,
}

impl Serialize for MeasurementResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ResultReport {
            page_load_time: self.page_load_time_ms,
            ping_latency: self.ping_latency_ms(),
            download_speed: self.download_mbps(),
            upload_speed: self.upload_mbps(),
            network_type: &self.network_type,
            connection_type: &self.connection_type,
            overall_score: self.score.overall,
            tier: self.tier(),
            valid: ValidityFlags {
                ping_latency: self.ping.is_measured(),
                download_speed: self.download.is_measured(),
                upload_speed: self.upload.is_measured(),
            },
            score_breakdown: &self.score,
            session_id: &self.session_id,
            measured_at: self.measured_at,
        }
        .serialize(serializer)
    }
}
