//! Order statistics, peak detection and peak alignment

use chrono::{DateTime, Utc};

use crate::types::Summary;

/// Percentile of an ascending-sorted slice by linear interpolation
///
/// Rank `k = (n-1)*p`, interpolated between floor and ceil ranks.
/// Empty input yields 0.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let k = (sorted.len() - 1) as f64 * p;
    let f = k.floor() as usize;
    let c = (f + 1).min(sorted.len() - 1);
    if f == c {
        return sorted[f];
    }
    sorted[f] * (c as f64 - k) + sorted[c] * (k - f as f64)
}

/// Sort a copy of `values` ascending (NaN last)
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut s = values.to_vec();
    s.sort_by(|a, b| a.total_cmp(b));
    s
}

/// Mean / median / p95 / p99 / max of a series
pub fn summarize(values: &[f64]) -> Summary {
    if values.is_empty() {
        return Summary::default();
    }
    let s = sorted(values);
    Summary {
        mean: s.iter().sum::<f64>() / s.len() as f64,
        median: percentile(&s, 0.5),
        p95: percentile(&s, 0.95),
        p99: percentile(&s, 0.99),
        max: s[s.len() - 1],
    }
}

/// Indices of strict local maxima and minima (1 ≤ i ≤ n-2)
pub fn detect_peaks(values: &[u16]) -> Vec<usize> {
    if values.len() < 3 {
        return Vec::new();
    }
    (1..values.len() - 1)
        .filter(|&i| {
            let (prev, cur, next) = (values[i - 1], values[i], values[i + 1]);
            (cur > prev && cur > next) || (cur < prev && cur < next)
        })
        .collect()
}

/// Drift samples from matching authoritative peaks to decoded peaks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakAlignment {
    /// Extrema in the authoritative series
    pub auth_peaks: usize,
    /// |Δt| of each matched pair (seconds)
    pub timing_drifts: Vec<f64>,
    /// |decoded - auth| / max(1, auth) of each matched pair
    pub value_rel_drifts: Vec<f64>,
}

impl PeakAlignment {
    pub fn matched(&self) -> usize {
        self.timing_drifts.len()
    }
}

/// Match each authoritative peak to the nearest decoded peak in time
///
/// A pair matches when the nearest decoded peak lies within `tolerance_secs`.
/// Unmatched authoritative peaks contribute no drift sample. Ties resolve to
/// the earlier decoded peak.
pub fn align_peaks(
    times: &[DateTime<Utc>],
    auth: &[u16],
    decoded: &[u16],
    tolerance_secs: f64,
) -> PeakAlignment {
    let auth_peaks = detect_peaks(auth);
    let decoded_peaks = detect_peaks(decoded);

    let mut alignment = PeakAlignment {
        auth_peaks: auth_peaks.len(),
        ..PeakAlignment::default()
    };

    for &pa in &auth_peaks {
        let nearest = decoded_peaks
            .iter()
            .map(|&pg| (pg, seconds_between(times[pa], times[pg])))
            .fold(None, |best: Option<(usize, f64)>, (pg, dt)| match best {
                Some((_, best_dt)) if best_dt <= dt => best,
                _ => Some((pg, dt)),
            });

        if let Some((pg, dt)) = nearest {
            if dt <= tolerance_secs {
                let av = auth[pa] as f64;
                let gv = decoded[pg] as f64;
                alignment.timing_drifts.push(dt);
                alignment.value_rel_drifts.push((gv - av).abs() / av.max(1.0));
            }
        }
    }

    alignment
}

fn seconds_between(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
    let d = b - a;
    match d.num_nanoseconds() {
        Some(ns) => (ns as f64 / 1e9).abs(),
        None => (d.num_milliseconds() as f64 / 1e3).abs(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
