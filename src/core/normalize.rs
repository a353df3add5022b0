//! Percentile-robust mapping of raw proxy values to basis points
//!
//! The scale is fitted per batch: p5 maps to 0, p95 maps to 10000, and
//! everything outside is clamped. The same batch therefore always yields the
//! same integers, but values are not comparable across batches.

use crate::core::stats::{percentile, sorted};
use crate::types::NormalizeError;
use crate::{BPS_MAX, NORMALIZE_P_HIGH, NORMALIZE_P_LOW, SPAN_EPSILON};

/// Fitted 5th/95th percentile scale of one batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BpsScale {
    pub p5: f64,
    pub p95: f64,
    /// max(p95 - p5, SPAN_EPSILON)
    pub span: f64,
}

impl BpsScale {
    /// Fit the scale to a batch of finite values
    pub fn fit(values: &[f64]) -> Result<Self, NormalizeError> {
        if values.is_empty() {
            return Err(NormalizeError::EmptyBatch);
        }
        if let Some((index, value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(NormalizeError::NonFinite {
                index,
                value: *value,
            });
        }

        let s = sorted(values);
        let p5 = percentile(&s, NORMALIZE_P_LOW);
        let p95 = percentile(&s, NORMALIZE_P_HIGH);
        Ok(Self {
            p5,
            p95,
            span: (p95 - p5).max(SPAN_EPSILON),
        })
    }

    /// Map one value onto [0, BPS_MAX], rounding to nearest
    pub fn to_bps(&self, value: f64) -> u16 {
        let scaled = (value - self.p5) / self.span * BPS_MAX as f64;
        scaled.clamp(0.0, BPS_MAX as f64).round() as u16
    }
}

/// Normalize a batch in one pass
pub fn normalize(values: &[f64]) -> Result<Vec<u16>, NormalizeError> {
    let scale = BpsScale::fit(values)?;
    Ok(values.iter().map(|v| scale.to_bps(*v)).collect())
}
