//! Integration tests for the encoder
//!
//! Both cadence tables plus sidecar from one configuration, atomic
//! replacement, deterministic output and up-front window rejection.

mod common;

use chrono::Duration;
use pretty_assertions::assert_eq;

use common::{t0, Offline, Wobble};
use gtab::core::{dataset_id, load_meta, EncodeConfig, Encoder, LowPrecisionEphemeris, Table};
use gtab::types::{EncodeError, Field, FieldMask, ProviderError};
use gtab::{BPS_MAX, FORMAT_VERSION, HEADER_SIZE};

// =============================================================================
// OUTPUT SET
// =============================================================================

/// Test one hour with the built-in ephemeris yields both cadence tables
#[test]
fn test_one_hour_with_builtin_ephemeris() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = EncodeConfig::new(t0(), t0() + Duration::hours(1), dir.path());
    let out = Encoder::new(LowPrecisionEphemeris::new()).encode(&cfg).unwrap();

    let counts: Vec<u32> = out.tables.iter().map(|t| t.header.count).collect();
    assert_eq!(counts, vec![3_601, 61]);

    let one_second = Table::open(dir.path().join("gtab_1s.bin")).unwrap();
    let sixty = Table::open(dir.path().join("gtab_60s.bin")).unwrap();
    assert_eq!(one_second.coverage(), (t0(), t0() + Duration::hours(1)));
    assert_eq!(sixty.coverage(), one_second.coverage());

    let size = std::fs::metadata(dir.path().join("gtab_60s.bin")).unwrap().len();
    assert_eq!(size, (HEADER_SIZE + 61 * 6) as u64);

    for i in 0..61u64 {
        assert!(sixty.read_bps(i).unwrap() <= BPS_MAX);
    }
}

/// Test the sidecar records provenance of the run
#[test]
fn test_sidecar_contents() {
    let dir = tempfile::tempdir().unwrap();
    let end = t0() + Duration::minutes(30);
    let cfg = EncodeConfig::new(t0(), end, dir.path());
    let out = Encoder::new(LowPrecisionEphemeris::new()).encode(&cfg).unwrap();

    let meta = load_meta(&dir.path().join("gtab.meta.json")).unwrap();
    assert_eq!(meta.kernel, "lowprec-meeus-v1");
    assert_eq!(meta.start, t0());
    assert_eq!(meta.end, end);
    assert_eq!(meta.fields_mask, FieldMask::DEFAULT);
    assert_eq!(meta.version, FORMAT_VERSION);
    assert_eq!(
        meta.dataset_id,
        dataset_id("lowprec-meeus-v1", t0(), end, FieldMask::DEFAULT)
    );
    assert_eq!(meta, out.meta);

    let text = std::fs::read_to_string(&out.meta_path).unwrap();
    assert!(text.ends_with("}\n"));
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["fields_mask"], 3);
}

/// Test re-encoding replaces existing tables byte for byte
#[test]
fn test_encoding_is_deterministic_and_replaces_files() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = EncodeConfig::new(t0(), t0() + Duration::minutes(20), dir.path());
    let encoder = Encoder::new(Wobble::default());

    encoder.encode(&cfg).unwrap();
    let first = std::fs::read(dir.path().join("gtab_1s.bin")).unwrap();

    std::fs::write(dir.path().join("gtab_1s.bin"), b"stale").unwrap();
    encoder.encode(&cfg).unwrap();
    let second = std::fs::read(dir.path().join("gtab_1s.bin")).unwrap();

    assert_eq!(first, second);
    assert!(!dir.path().join("gtab_1s.tmp").exists());
}

/// Test each cadence is normalized over its own samples
#[test]
fn test_cadences_have_independent_bases() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = EncodeConfig::new(t0(), t0() + Duration::minutes(20), dir.path());
    let wobble = Wobble {
        period_secs: 600.0,
        amplitude_km: 20_000.0,
    };
    let out = Encoder::new(wobble).encode(&cfg).unwrap();

    // 60s grid hits the sine only at multiples of 36 degrees, the 1s grid
    // fills the whole curve, so the 5th/95th percentiles differ
    let (fine, coarse) = (&out.tables[0].scale, &out.tables[1].scale);
    assert!(fine.p95 > coarse.p95);
    assert!(fine.p5 < coarse.p5);
}

/// Test optional fields store the provider distances
#[test]
fn test_extended_fields_round_trip_distances() {
    let dir = tempfile::tempdir().unwrap();
    let wobble = Wobble::default();
    let cfg = EncodeConfig::new(t0(), t0() + Duration::minutes(10), dir.path())
        .with_field_mask(FieldMask::from_fields(&[Field::TideBps, Field::MoonRkm, Field::SunRinv3]));
    Encoder::new(Wobble::default()).encode(&cfg).unwrap();

    let table = Table::open(dir.path().join("gtab_1s.bin")).unwrap();
    assert_eq!(table.layout().width(), 10);
    for secs in [0i64, 17, 150, 599] {
        let t = t0() + Duration::seconds(secs);
        let stored = table.read_f32(Field::MoonRkm, secs as u64).unwrap() as f64;
        assert!((stored - wobble.moon_km(t)).abs() < 0.05, "at {secs}s: {stored}");
    }
    assert!(matches!(
        table.read_f32(Field::TideRaw, 0),
        Err(gtab::types::TableError::FieldAbsent(Field::TideRaw))
    ));
}

// =============================================================================
// REJECTION
// =============================================================================

/// Test a window shorter than one coarse step leaves no files
#[test]
fn test_window_shorter_than_coarse_cadence_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = EncodeConfig::new(t0(), t0() + Duration::seconds(59), dir.path());
    let err = Encoder::new(Wobble::default()).encode(&cfg).unwrap_err();

    assert!(matches!(err, EncodeError::WindowTooShort { cadence_secs: 60, .. }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

/// Test a window of exactly one coarse step encodes two records
#[test]
fn test_exactly_one_coarse_step_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = EncodeConfig::new(t0(), t0() + Duration::seconds(60), dir.path());
    let out = Encoder::new(Wobble::default()).encode(&cfg).unwrap();
    assert_eq!(out.tables[1].header.count, 2);
    assert_eq!(out.tables[0].header.count, 61);
}

/// Test a missing position source aborts the encode
#[test]
fn test_unavailable_provider_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = EncodeConfig::new(t0(), t0() + Duration::minutes(5), dir.path());
    let err = Encoder::new(Offline).encode(&cfg).unwrap_err();
    assert!(matches!(err, EncodeError::Provider(ProviderError::Unavailable(_))));
    assert!(!dir.path().join("gtab_1s.bin").exists());
}
