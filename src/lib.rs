//! GTAB: compact fixed-cadence tables of the Sun/Moon tidal proxy
//!
//! Encoder: ephemeris → signal → basis points → binary table
//! Lookup: O(1) positioned reads with linear interpolation
//! Validator: independent recomputation → error stats → pass/fail report

pub mod core;
pub mod types;

// =============================================================================
// FORMAT [C] - GTAB v1 binary layout
// =============================================================================

/// File magic identifying the format family
pub const GTAB_MAGIC: [u8; 5] = *b"GTAB1";

/// Only supported format version
pub const FORMAT_VERSION: u16 = 1;

/// Header size: magic(5) + version(2) + epoch(8) + interval(8) + count(4) + mask(4) + reserved(16)
pub const HEADER_SIZE: usize = 47;

/// Reserved header padding (zero-filled)
pub const RESERVED_SIZE: usize = 16;

/// Literal mixed into the dataset fingerprint
pub const DATASET_ID_SALT: &[u8] = b"gtab_v1";

/// Hex characters kept from the fingerprint digest
pub const DATASET_ID_LEN: usize = 12;

// =============================================================================
// PHYSICS [C] - Gravitational parameters (km^3/s^2)
// =============================================================================

pub const MU_SUN: f64 = 1.32712440018e11;
pub const MU_MOON: f64 = 4.9048695e3;

/// Astronomical unit in km
pub const AU_KM: f64 = 149_597_870.7;

// =============================================================================
// NORMALIZATION [C]
// =============================================================================

/// Upper end of the basis-point scale
pub const BPS_MAX: u16 = 10_000;

/// Lower anchor percentile (maps to 0 bps)
pub const NORMALIZE_P_LOW: f64 = 0.05;

/// Upper anchor percentile (maps to 10000 bps)
pub const NORMALIZE_P_HIGH: f64 = 0.95;

/// Minimum percentile span
pub const SPAN_EPSILON: f64 = 1e-12;

// =============================================================================
// ENCODER [C]
// =============================================================================

/// Cadences produced from one configuration (seconds)
pub const ENCODE_CADENCES_SECS: [u32; 2] = [1, 60];

pub const TABLE_1S_FILE: &str = "gtab_1s.bin";
pub const TABLE_60S_FILE: &str = "gtab_60s.bin";
pub const META_FILE: &str = "gtab.meta.json";

// =============================================================================
// VALIDATOR [C] - Defaults from the accuracy harness
// =============================================================================

/// Default sampling cadence (seconds)
pub const DEFAULT_VALIDATION_CADENCE_SECS: u32 = 60;

/// Default window when no start is given: now minus this many days
pub const DEFAULT_VALIDATION_LOOKBACK_DAYS: i64 = 7;

/// Fewer samples than this cannot be judged
pub const MIN_VALIDATION_SAMPLES: usize = 10;

/// Peaks further apart than this many cadences never match
pub const PEAK_MATCH_CADENCES: f64 = 2.0;

pub const DEFAULT_REL_ERROR_MEDIAN: f64 = 1.0e-3;
pub const DEFAULT_REL_ERROR_P99: f64 = 5.0e-3;
pub const DEFAULT_PEAK_TIMING_DRIFT_SECONDS_P99: f64 = 120.0;
pub const DEFAULT_PEAK_VALUE_REL_DRIFT_P99: f64 = 2.0e-3;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
