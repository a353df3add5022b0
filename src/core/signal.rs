//! Tidal proxy signal: μ/r³ summed over Sun and Moon
//!
//! Pure and total over positive distances. Zero, negative or non-finite
//! distances are precondition violations and are rejected, never clamped.

use crate::types::{GeocentricPositions, SignalError};
use crate::{MU_MOON, MU_SUN};

/// Per-sample terms derived from one pair of distances
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalTerms {
    pub sun_km: f64,
    pub moon_km: f64,
    pub sun_rinv3: f64,
    pub moon_rinv3: f64,
    /// MU_SUN/d_sun³ + MU_MOON/d_moon³
    pub raw: f64,
}

/// Proxy value for one pair of distances (km)
pub fn tidal_proxy(sun_km: f64, moon_km: f64) -> Result<f64, SignalError> {
    Ok(signal_terms(sun_km, moon_km)?.raw)
}

/// Proxy value plus the intermediate terms
pub fn signal_terms(sun_km: f64, moon_km: f64) -> Result<SignalTerms, SignalError> {
    let sun_rinv3 = inverse_cube("sun", sun_km)?;
    let moon_rinv3 = inverse_cube("moon", moon_km)?;
    Ok(SignalTerms {
        sun_km,
        moon_km,
        sun_rinv3,
        moon_rinv3,
        raw: MU_SUN * sun_rinv3 + MU_MOON * moon_rinv3,
    })
}

/// Terms for a geocentric position pair
pub fn terms_for(positions: &GeocentricPositions) -> Result<SignalTerms, SignalError> {
    signal_terms(positions.sun_distance_km(), positions.moon_distance_km())
}

fn inverse_cube(body: &'static str, km: f64) -> Result<f64, SignalError> {
    if !km.is_finite() || km <= 0.0 {
        return Err(SignalError::InvalidDistance { body, km });
    }
    Ok(1.0 / (km * km * km))
}
