//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::f64::consts::PI;

use chrono::{DateTime, Utc};
use gtab::core::PositionProvider;
use gtab::types::{GeocentricPositions, ProviderError};
use gtab::AU_KM;

/// 2025-08-01T00:00:00Z
pub const T0: i64 = 1_754_006_400;

pub fn t0() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(T0, 0).unwrap()
}

/// Moon distance oscillating sinusoidally around 384 400 km
///
/// The default 700 s period keeps a 60 s grid off the sine's symmetry
/// points, so sampled extrema are strict.
pub struct Wobble {
    pub period_secs: f64,
    pub amplitude_km: f64,
}

impl Default for Wobble {
    fn default() -> Self {
        Self {
            period_secs: 700.0,
            amplitude_km: 20_000.0,
        }
    }
}

impl Wobble {
    pub fn moon_km(&self, t: DateTime<Utc>) -> f64 {
        let elapsed = (t.timestamp() - T0) as f64 + t.timestamp_subsec_nanos() as f64 * 1e-9;
        384_400.0 + self.amplitude_km * (2.0 * PI * elapsed / self.period_secs).sin()
    }
}

impl PositionProvider for Wobble {
    fn identity(&self) -> String {
        "wobble-fixture".into()
    }

    fn positions(&self, times: &[DateTime<Utc>]) -> Result<Vec<GeocentricPositions>, ProviderError> {
        Ok(times
            .iter()
            .map(|t| GeocentricPositions::from_distances(AU_KM, self.moon_km(*t)))
            .collect())
    }
}

/// Provider whose data source is missing
pub struct Offline;

impl PositionProvider for Offline {
    fn identity(&self) -> String {
        "offline".into()
    }

    fn positions(&self, _times: &[DateTime<Utc>]) -> Result<Vec<GeocentricPositions>, ProviderError> {
        Err(ProviderError::Unavailable("kernel not found".into()))
    }
}
