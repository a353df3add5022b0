//! Metrics report emitted once per validation run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::Thresholds;

/// Distribution summary of one error or drift series
///
/// An empty series summarizes to all zeros.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
}

/// Statistics of a completed comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyStatistics {
    /// |decoded - authoritative| / max(1, authoritative)
    pub rel_error: Summary,
    /// |decoded - authoritative| in basis points
    pub abs_error: Summary,
    /// Local extrema found in the authoritative series
    pub peak_count: usize,
    /// Authoritative peaks with a decoded peak within tolerance
    pub matched_peaks: usize,
    /// Timing offset of matched peaks (seconds)
    pub peak_timing_drift_seconds: Summary,
    /// Value offset of matched peaks, relative
    pub peak_value_rel_drift: Summary,
}

/// Why a run stopped before comparing values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    /// Table header failed to decode
    BadHeader(String),
    /// Requested window does not intersect the table span
    CoverageGap,
    /// Too few samples to judge accuracy
    InsufficientSamples,
}

impl ValidationReason {
    /// Get the code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadHeader(_) => "bad_header",
            Self::CoverageGap => "coverage_gap",
            Self::InsufficientSamples => "insufficient_samples",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::BadHeader(_) => "Table header could not be decoded",
            Self::CoverageGap => "Validation window outside table coverage",
            Self::InsufficientSamples => "Too few samples in the clipped window",
        }
    }
}

impl std::fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadHeader(detail) => write!(f, "{}:{}", self.code(), detail),
            _ => write!(f, "{}", self.code()),
        }
    }
}

impl std::str::FromStr for ValidationReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(detail) = s.strip_prefix("bad_header:") {
            return Ok(Self::BadHeader(detail.to_string()));
        }
        match s {
            "coverage_gap" => Ok(Self::CoverageGap),
            "insufficient_samples" => Ok(Self::InsufficientSamples),
            other => Err(format!("unknown validation reason: {other}")),
        }
    }
}

impl Serialize for ValidationReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ValidationReason {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Output of one validation run; written once, never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub dataset_id: String,
    pub generated_at: DateTime<Utc>,
    pub records_compared: usize,
    /// Absent on early-exit paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<AccuracyStatistics>,
    pub passes: bool,
    /// Present only on early-exit paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ValidationReason>,
    pub thresholds: Thresholds,
}

impl MetricsReport {
    /// Report for a run that stopped before comparing values
    pub fn early_exit(
        dataset_id: impl Into<String>,
        records_compared: usize,
        reason: ValidationReason,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            generated_at: Utc::now(),
            records_compared,
            statistics: None,
            passes: false,
            reason: Some(reason),
            thresholds,
        }
    }

    /// Report for a completed comparison
    pub fn completed(
        dataset_id: impl Into<String>,
        records_compared: usize,
        statistics: AccuracyStatistics,
        passes: bool,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            generated_at: Utc::now(),
            records_compared,
            statistics: Some(statistics),
            passes,
            reason: None,
            thresholds,
        }
    }
}
