//! Geocentric position vectors supplied by a position provider

use serde::{Deserialize, Serialize};

/// Sun and Moon positions relative to Earth at one instant (km)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeocentricPositions {
    pub sun_km: [f64; 3],
    pub moon_km: [f64; 3],
}

impl GeocentricPositions {
    /// Positions from distances alone (vectors along +x)
    pub fn from_distances(sun_km: f64, moon_km: f64) -> Self {
        Self {
            sun_km: [sun_km, 0.0, 0.0],
            moon_km: [moon_km, 0.0, 0.0],
        }
    }

    /// Earth–Sun distance (km)
    pub fn sun_distance_km(&self) -> f64 {
        norm(&self.sun_km)
    }

    /// Earth–Moon distance (km)
    pub fn moon_distance_km(&self) -> f64 {
        norm(&self.moon_km)
    }
}

fn norm(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}
