//! Position providers
//!
//! The encoder and validator only see the `PositionProvider` trait. The
//! built-in `LowPrecisionEphemeris` evaluates truncated analytic series for
//! the Sun (mean elements + equation of center) and the Moon (principal
//! periodic terms); accuracy is a few hundred km for the Moon, well inside
//! what a normalized proxy can resolve.

use chrono::{DateTime, Utc};

use crate::types::{GeocentricPositions, ProviderError};
use crate::AU_KM;

/// Source of geocentric Sun and Moon positions
pub trait PositionProvider {
    /// Stable identity, folded into the dataset fingerprint
    fn identity(&self) -> String;

    /// One position pair per timestamp, in order
    fn positions(&self, times: &[DateTime<Utc>]) -> Result<Vec<GeocentricPositions>, ProviderError>;
}

/// Query a provider and enforce one position per timestamp
pub fn positions_checked<P: PositionProvider + ?Sized>(
    provider: &P,
    times: &[DateTime<Utc>],
) -> Result<Vec<GeocentricPositions>, ProviderError> {
    let positions = provider.positions(times)?;
    if positions.len() != times.len() {
        return Err(ProviderError::LengthMismatch {
            expected: times.len(),
            actual: positions.len(),
        });
    }
    Ok(positions)
}

// =============================================================================
// LOW-PRECISION ANALYTIC EPHEMERIS
// =============================================================================

pub const LOW_PRECISION_IDENTITY: &str = "lowprec-meeus-v1";

const J2000_JD: f64 = 2_451_545.0;
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const DAYS_PER_CENTURY: f64 = 36_525.0;

/// Lunar longitude terms: (D, M, M', F, coefficient in 1e-6 deg)
const MOON_LONGITUDE: [(f64, f64, f64, f64, f64); 10] = [
    (0.0, 0.0, 1.0, 0.0, 6_288_774.0),
    (2.0, 0.0, -1.0, 0.0, 1_274_027.0),
    (2.0, 0.0, 0.0, 0.0, 658_314.0),
    (0.0, 0.0, 2.0, 0.0, 213_618.0),
    (0.0, 1.0, 0.0, 0.0, -185_116.0),
    (0.0, 0.0, 0.0, 2.0, -114_332.0),
    (2.0, 0.0, -2.0, 0.0, 58_793.0),
    (2.0, -1.0, -1.0, 0.0, 57_066.0),
    (2.0, 0.0, 1.0, 0.0, 53_322.0),
    (2.0, -1.0, 0.0, 0.0, 45_758.0),
];

/// Lunar distance terms: (D, M, M', F, coefficient in m)
const MOON_DISTANCE: [(f64, f64, f64, f64, f64); 13] = [
    (0.0, 0.0, 1.0, 0.0, -20_905_355.0),
    (2.0, 0.0, -1.0, 0.0, -3_699_111.0),
    (2.0, 0.0, 0.0, 0.0, -2_955_968.0),
    (0.0, 0.0, 2.0, 0.0, -569_925.0),
    (0.0, 1.0, 0.0, 0.0, 48_888.0),
    (0.0, 0.0, 0.0, 2.0, -3_149.0),
    (2.0, 0.0, -2.0, 0.0, 246_158.0),
    (2.0, -1.0, -1.0, 0.0, -152_138.0),
    (2.0, 0.0, 1.0, 0.0, -170_733.0),
    (2.0, -1.0, 0.0, 0.0, -204_586.0),
    (0.0, 1.0, -1.0, 0.0, -129_620.0),
    (1.0, 0.0, 0.0, 0.0, 108_743.0),
    (0.0, 1.0, 1.0, 0.0, 104_755.0),
];

/// Lunar latitude terms: (D, M, M', F, coefficient in 1e-6 deg)
const MOON_LATITUDE: [(f64, f64, f64, f64, f64); 6] = [
    (0.0, 0.0, 0.0, 1.0, 5_128_122.0),
    (0.0, 0.0, 1.0, 1.0, 280_602.0),
    (0.0, 0.0, 1.0, -1.0, 277_693.0),
    (2.0, 0.0, 0.0, -1.0, 173_237.0),
    (2.0, 0.0, -1.0, 1.0, 55_413.0),
    (2.0, 0.0, -1.0, -1.0, 46_271.0),
];

/// Built-in analytic Sun/Moon positions (geocentric ecliptic, km)
#[derive(Debug, Clone, Copy, Default)]
pub struct LowPrecisionEphemeris;

impl LowPrecisionEphemeris {
    pub fn new() -> Self {
        Self
    }

    /// Position pair at one instant
    pub fn at(&self, t: DateTime<Utc>) -> GeocentricPositions {
        let jc = julian_centuries(t);
        GeocentricPositions {
            sun_km: sun_vector_km(jc),
            moon_km: moon_vector_km(jc),
        }
    }
}

impl PositionProvider for LowPrecisionEphemeris {
    fn identity(&self) -> String {
        LOW_PRECISION_IDENTITY.to_string()
    }

    fn positions(&self, times: &[DateTime<Utc>]) -> Result<Vec<GeocentricPositions>, ProviderError> {
        Ok(times.iter().map(|t| self.at(*t)).collect())
    }
}

/// Julian centuries since J2000.0
fn julian_centuries(t: DateTime<Utc>) -> f64 {
    let unix = t.timestamp() as f64 + t.timestamp_subsec_nanos() as f64 * 1e-9;
    let jd = unix / 86_400.0 + UNIX_EPOCH_JD;
    (jd - J2000_JD) / DAYS_PER_CENTURY
}

fn sun_vector_km(jc: f64) -> [f64; 3] {
    let l0 = 280.46646 + 36_000.76983 * jc + 0.000_303_2 * jc * jc;
    let m = 357.52911 + 35_999.05029 * jc - 0.000_153_7 * jc * jc;
    let e = 0.016_708_634 - 0.000_042_037 * jc - 0.000_000_126_7 * jc * jc;
    let mr = m.to_radians();
    let c = (1.914602 - 0.004817 * jc - 0.000014 * jc * jc) * mr.sin()
        + (0.019993 - 0.000101 * jc) * (2.0 * mr).sin()
        + 0.000289 * (3.0 * mr).sin();

    let lon = (l0 + c).to_radians();
    let nu = (m + c).to_radians();
    let r_au = 1.000_001_018 * (1.0 - e * e) / (1.0 + e * nu.cos());
    let r = r_au * AU_KM;
    [r * lon.cos(), r * lon.sin(), 0.0]
}

fn moon_vector_km(jc: f64) -> [f64; 3] {
    let lp = 218.316_447_7 + 481_267.881_234_21 * jc;
    let args = MoonArgs {
        d: (297.850_192_1 + 445_267.111_403_4 * jc).to_radians(),
        m: (357.529_109_2 + 35_999.050_290_9 * jc).to_radians(),
        mp: (134.963_396_4 + 477_198.867_505_5 * jc).to_radians(),
        f: (93.272_095_0 + 483_202.017_523_3 * jc).to_radians(),
    };

    let sum_l: f64 = MOON_LONGITUDE.iter().map(|t| t.4 * args.angle(t).sin()).sum();
    let sum_r: f64 = MOON_DISTANCE.iter().map(|t| t.4 * args.angle(t).cos()).sum();
    let sum_b: f64 = MOON_LATITUDE.iter().map(|t| t.4 * args.angle(t).sin()).sum();

    let lon = (lp + sum_l / 1e6).to_radians();
    let lat = (sum_b / 1e6).to_radians();
    let r = 385_000.56 + sum_r / 1000.0;
    [
        r * lat.cos() * lon.cos(),
        r * lat.cos() * lon.sin(),
        r * lat.sin(),
    ]
}

struct MoonArgs {
    d: f64,
    m: f64,
    mp: f64,
    f: f64,
}

impl MoonArgs {
    fn angle(&self, term: &(f64, f64, f64, f64, f64)) -> f64 {
        term.0 * self.d + term.1 * self.m + term.2 * self.mp + term.3 * self.f
    }
}
