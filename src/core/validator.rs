//! Accuracy validator
//!
//! One run is a straight pipeline with early exits:
//! header → window clip → sampling → authoritative series → decoded series
//! → error statistics → peak alignment → verdict.
//!
//! Early exits (bad header, coverage gap, too few samples) are reported in
//! the metrics document with `passes = false`. An empty or inverted window
//! clips to nothing and is a coverage gap. Only setup failures (unreadable
//! table, provider) surface as `ValidateError`.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::core::encoder::{load_meta, sample_times};
use crate::core::ephemeris::{positions_checked, PositionProvider};
use crate::core::normalize::normalize;
use crate::core::persist::write_atomic;
use crate::core::signal::terms_for;
use crate::core::stats::{align_peaks, summarize};
use crate::core::table::Table;
use crate::types::{
    AccuracyStatistics, MetricsReport, TableError, Thresholds, ValidateError, ValidationReason,
};
use crate::{DEFAULT_VALIDATION_CADENCE_SECS, META_FILE, MIN_VALIDATION_SAMPLES, PEAK_MATCH_CADENCES};

/// Parameters of one validation run
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Label copied into the report
    pub dataset_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Sampling cadence in seconds (0 is raised to 1)
    pub cadence_secs: u32,
    pub thresholds: Thresholds,
}

impl ValidationConfig {
    pub fn new(dataset_id: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            start,
            end,
            cadence_secs: DEFAULT_VALIDATION_CADENCE_SECS,
            thresholds: Thresholds::default(),
        }
    }

    pub fn with_cadence(mut self, cadence_secs: u32) -> Self {
        self.cadence_secs = cadence_secs;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

/// Validator bound to the authoritative position provider
pub struct Validator<P> {
    provider: P,
}

impl<P: PositionProvider> Validator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Validate one table over the configured window
    pub fn validate(
        &self,
        table_path: &Path,
        config: &ValidationConfig,
    ) -> Result<MetricsReport, ValidateError> {
        let cadence_secs = config.cadence_secs.max(1);
        let thresholds = config.thresholds;
        let early_exit = |records: usize, reason: ValidationReason| {
            info!(dataset_id = %config.dataset_id, %reason, records, "validation stopped early");
            MetricsReport::early_exit(config.dataset_id.clone(), records, reason, thresholds)
        };

        // Header; the handle closes when this function returns
        let table = match Table::open(table_path) {
            Ok(table) => table,
            Err(TableError::Io(source)) => {
                return Err(ValidateError::TableUnreadable {
                    path: table_path.to_path_buf(),
                    source,
                })
            }
            Err(e) => return Ok(early_exit(0, ValidationReason::BadHeader(e.to_string()))),
        };

        // Window intersection; inverted requests clip to nothing
        let (table_start, table_end) = table.coverage();
        let start = config.start.max(table_start);
        let end = config.end.min(table_end);
        if end <= start {
            return Ok(early_exit(0, ValidationReason::CoverageGap));
        }

        // Sampling
        let times = sample_times(start, end, cadence_secs);
        if times.len() < MIN_VALIDATION_SAMPLES {
            return Ok(early_exit(times.len(), ValidationReason::InsufficientSamples));
        }
        debug!(samples = times.len(), %start, %end, cadence_secs, "sampling window");

        // Authoritative series, normalized over this batch only
        let positions = positions_checked(&self.provider, &times)?;
        let raw = positions
            .iter()
            .map(|p| terms_for(p).map(|t| t.raw))
            .collect::<Result<Vec<_>, _>>()?;
        let auth_bps = normalize(&raw)?;

        // Decoded series; a failed lookup counts as 0
        let mut substituted = 0usize;
        let decoded_bps: Vec<u16> = times
            .iter()
            .map(|t| {
                table.lookup_bps(*t).unwrap_or_else(|e| {
                    debug!(at = %t, error = %e, "lookup failed, substituting 0");
                    substituted += 1;
                    0
                })
            })
            .collect();
        if substituted > 0 {
            warn!(substituted, "lookups substituted with 0");
        }

        let (statistics, passes) =
            compare_series(&times, &auth_bps, &decoded_bps, cadence_secs, &thresholds);
        info!(
            dataset_id = %config.dataset_id,
            records = times.len(),
            rel_error_median = statistics.rel_error.median,
            rel_error_p99 = statistics.rel_error.p99,
            peaks = statistics.peak_count,
            matched = statistics.matched_peaks,
            passes,
            "validation complete"
        );

        Ok(MetricsReport::completed(
            config.dataset_id.clone(),
            times.len(),
            statistics,
            passes,
            thresholds,
        ))
    }
}

/// Error and drift statistics of a decoded series against the authoritative one
///
/// The first and last samples are excluded from error statistics. Peaks
/// match within `2 * cadence` seconds.
pub fn compare_series(
    times: &[DateTime<Utc>],
    auth_bps: &[u16],
    decoded_bps: &[u16],
    cadence_secs: u32,
    thresholds: &Thresholds,
) -> (AccuracyStatistics, bool) {
    let n = times.len().min(auth_bps.len()).min(decoded_bps.len());
    let inner = 1..n.saturating_sub(1);

    let abs_errors: Vec<f64> = inner
        .clone()
        .map(|i| (f64::from(decoded_bps[i]) - f64::from(auth_bps[i])).abs())
        .collect();
    let rel_errors: Vec<f64> = inner
        .zip(&abs_errors)
        .map(|(i, abs)| abs / f64::from(auth_bps[i]).max(1.0))
        .collect();

    let tolerance_secs = PEAK_MATCH_CADENCES * f64::from(cadence_secs);
    let alignment = align_peaks(
        &times[..n],
        &auth_bps[..n],
        &decoded_bps[..n],
        tolerance_secs,
    );

    let statistics = AccuracyStatistics {
        rel_error: summarize(&rel_errors),
        abs_error: summarize(&abs_errors),
        peak_count: alignment.auth_peaks,
        matched_peaks: alignment.matched(),
        peak_timing_drift_seconds: summarize(&alignment.timing_drifts),
        peak_value_rel_drift: summarize(&alignment.value_rel_drifts),
    };
    let verdict = passes(&statistics, thresholds);
    (statistics, verdict)
}

/// All four threshold conjuncts; empty drift series summarize to 0
pub fn passes(statistics: &AccuracyStatistics, thresholds: &Thresholds) -> bool {
    statistics.rel_error.median <= thresholds.rel_error_median
        && statistics.rel_error.p99 <= thresholds.rel_error_p99
        && statistics.peak_timing_drift_seconds.p99 <= thresholds.peak_timing_drift_seconds_p99
        && statistics.peak_value_rel_drift.p99 <= thresholds.peak_value_rel_drift_p99
}

/// Thresholds from a JSON file, or the defaults when no file is given
pub fn load_thresholds(path: Option<&Path>) -> Result<Thresholds, ValidateError> {
    let Some(path) = path else {
        return Ok(Thresholds::default());
    };
    let json = std::fs::read_to_string(path).map_err(|source| ValidateError::Thresholds {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| ValidateError::ThresholdsFormat {
        path: path.to_path_buf(),
        source,
    })
}

/// Report label: explicit id, else the sibling sidecar's id, else the file name
pub fn resolve_dataset_id(explicit: Option<&str>, table_path: &Path) -> String {
    if let Some(id) = explicit {
        return id.to_string();
    }

    let meta_path = table_path
        .parent()
        .map(|dir| dir.join(META_FILE))
        .unwrap_or_else(|| Path::new(META_FILE).to_path_buf());
    if let Ok(meta) = load_meta(&meta_path) {
        return meta.dataset_id;
    }

    table_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| table_path.display().to_string())
}

/// Write the report as pretty JSON with a trailing newline
pub fn save_report(report: &MetricsReport, path: &Path) -> Result<(), ValidateError> {
    let mut json = serde_json::to_string_pretty(report)?;
    json.push('\n');
    write_atomic(path, json.as_bytes()).map_err(|source| ValidateError::Write {
        path: path.to_path_buf(),
        source,
    })
}

// =============================================================================
// TESTS
// =============================================================================
