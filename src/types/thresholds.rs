//! Accuracy thresholds applied by the validator

use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_PEAK_TIMING_DRIFT_SECONDS_P99, DEFAULT_PEAK_VALUE_REL_DRIFT_P99,
    DEFAULT_REL_ERROR_MEDIAN, DEFAULT_REL_ERROR_P99,
};

/// Upper bounds a table must stay within to pass
///
/// Missing keys in a thresholds document fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Median relative error
    pub rel_error_median: f64,
    /// 99th percentile relative error
    pub rel_error_p99: f64,
    /// 99th percentile peak timing drift (seconds)
    pub peak_timing_drift_seconds_p99: f64,
    /// 99th percentile peak value relative drift
    pub peak_value_rel_drift_p99: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            rel_error_median: DEFAULT_REL_ERROR_MEDIAN,
            rel_error_p99: DEFAULT_REL_ERROR_P99,
            peak_timing_drift_seconds_p99: DEFAULT_PEAK_TIMING_DRIFT_SECONDS_P99,
            peak_value_rel_drift_p99: DEFAULT_PEAK_VALUE_REL_DRIFT_P99,
        }
    }
}
