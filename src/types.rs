//! Type definitions shared across the pipeline and the renderers

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// The three timed network operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Latency,
    Download,
    Upload,
}

impl ProbeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProbeKind::Latency => "latency",
            ProbeKind::Download => "download",
            ProbeKind::Upload => "upload",
        }
    }

    /// Unit of the metric this probe produces
    pub fn unit(&self) -> &'static str {
        match self {
            ProbeKind::Latency => "ms",
            ProbeKind::Download | ProbeKind::Upload => "Mbps",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pipeline steps, in the order they are announced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStep {
    Starting,
    Latency,
    Download,
    Upload,
    Analyzing,
    Complete,
}

impl TestStep {
    /// Status line shown while the step is running
    pub fn status_text(&self) -> &'static str {
        match self {
            TestStep::Starting => "Testing connection...",
            TestStep::Latency => "Measuring response time...",
            TestStep::Download => "Testing download speed...",
            TestStep::Upload => "Testing upload speed...",
            TestStep::Analyzing => "Analyzing results...",
            TestStep::Complete => "Test completed!",
        }
    }

    /// Progress reached when the step is announced
    pub fn progress_percent(&self) -> u8 {
        match self {
            TestStep::Starting => 0,
            TestStep::Latency => 10,
            TestStep::Download => 30,
            TestStep::Upload => 60,
            TestStep::Analyzing => 90,
            TestStep::Complete => 100,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TestStep::Starting => "Starting",
            TestStep::Latency => "Ping Test",
            TestStep::Download => "Download Test",
            TestStep::Upload => "Upload Test",
            TestStep::Analyzing => "Network Analysis",
            TestStep::Complete => "Complete",
        }
    }
}

/// Qualitative tier derived from the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkTier {
    Strong,
    Moderate,
    Weak,
}

impl NetworkTier {
    pub const STRONG_THRESHOLD: u32 = 80;
    pub const MODERATE_THRESHOLD: u32 = 50;

    /// Lower bounds are inclusive: 80 is Strong, 50 is Moderate
    pub fn from_score(score: u32) -> Self {
        if score >= Self::STRONG_THRESHOLD {
            Self::Strong
        } else if score >= Self::MODERATE_THRESHOLD {
            Self::Moderate
        } else {
            Self::Weak
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkTier::Strong => "Strong",
            NetworkTier::Moderate => "Moderate",
            NetworkTier::Weak => "Weak",
        }
    }

    pub fn recommendations(&self) -> &'static [&'static str] {
        match self {
            NetworkTier::Strong => &[
                "Your network connection is excellent",
                "Perfect for streaming, gaming, and video calls",
                "No changes needed - enjoy your fast connection!",
            ],
            NetworkTier::Moderate => &[
                "Try moving to a different location for better signal",
                "Close other apps that might be using bandwidth",
                "Consider switching to WiFi if you're on mobile data",
            ],
            NetworkTier::Weak => &[
                "Move closer to your router or to an area with better reception",
                "Restart your device or toggle airplane mode",
                "Check if your data plan has been throttled",
                "Try connecting to a different WiFi network",
            ],
        }
    }
}

impl fmt::Display for NetworkTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(NetworkTier::from_score(79), NetworkTier::Moderate);
        assert_eq!(NetworkTier::from_score(80), NetworkTier::Strong);
        assert_eq!(NetworkTier::from_score(49), NetworkTier::Weak);
        assert_eq!(NetworkTier::from_score(50), NetworkTier::Moderate);
        assert_eq!(NetworkTier::from_score(0), NetworkTier::Weak);
        assert_eq!(NetworkTier::from_score(100), NetworkTier::Strong);
    }

    #[test]
    fn test_recommendation_counts() {
        assert_eq!(NetworkTier::Strong.recommendations().len(), 3);
        assert_eq!(NetworkTier::Moderate.recommendations().len(), 3);
        assert_eq!(NetworkTier::Weak.recommendations().len(), 4);
        assert!(NetworkTier::Weak.recommendations()[0].starts_with("Move closer"));
    }

    #[test]
    fn test_step_progress_is_monotonic() {
        let steps = [
            TestStep::Starting,
            TestStep::Latency,
            TestStep::Download,
            TestStep::Upload,
            TestStep::Analyzing,
            TestStep::Complete,
        ];
        let progress: Vec<u8> = steps.iter().map(|s| s.progress_percent()).collect();
        assert!(progress.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(progress.last(), Some(&100));
    }

    #[test]
    fn test_probe_kind_units() {
        assert_eq!(ProbeKind::Latency.unit(), "ms");
        assert_eq!(ProbeKind::Upload.unit(), "Mbps");
        assert_eq!(ProbeKind::Download.to_string(), "download");
    }
}
