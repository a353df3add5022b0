//! Integration tests for the lookup engine
//!
//! Exact reads at sample instants, interpolation bounds, range rejection
//! and header rejection against files on disk.

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Duration;
use pretty_assertions::assert_eq;

use common::{t0, Wobble, T0};
use gtab::core::{write_table, EncodeConfig, Encoder, Table};
use gtab::types::{Field, FieldMask, SampleRecord, TableError, TableHeader};

const SECOND_NS: i64 = 1_000_000_000;

fn write_bps(dir: &Path, name: &str, values: &[u16]) -> PathBuf {
    let path = dir.join(name);
    let header = TableHeader::new(T0, SECOND_NS, values.len() as u32, FieldMask::DEFAULT);
    let records: Vec<SampleRecord> = values.iter().map(|v| SampleRecord::bps(*v)).collect();
    write_table(&path, &header, &records).unwrap();
    path
}

// =============================================================================
// SCENARIO: TEN KNOWN SAMPLES
// =============================================================================

/// Test lookup halfway between known samples
#[test]
fn test_midpoint_of_known_samples() {
    let dir = tempfile::tempdir().unwrap();
    let values = [0u16, 1111, 2222, 3333, 4444, 5555, 6666, 7777, 8888, 10_000];
    let table = Table::open(write_bps(dir.path(), "a.bin", &values)).unwrap();

    assert_eq!(table.coverage(), (t0(), t0() + Duration::seconds(9)));
    assert_eq!(table.lookup_bps(t0() + Duration::milliseconds(4_500)).unwrap(), 5_000);

    let exact: Vec<u16> = (0..10)
        .map(|i| table.lookup_bps(t0() + Duration::seconds(i)).unwrap())
        .collect();
    assert_eq!(exact, values.to_vec());
}

// =============================================================================
// PROPERTIES OVER AN ENCODED TABLE
// =============================================================================

/// Test interpolated values stay between neighbouring records
#[test]
fn test_interpolation_bounded_by_neighbours() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = EncodeConfig::new(t0(), t0() + Duration::minutes(20), dir.path());
    Encoder::new(Wobble::default()).encode(&cfg).unwrap();
    let table = Table::open(dir.path().join("gtab_60s.bin")).unwrap();

    for i in 0..(table.len() as u64 - 1) {
        let v0 = table.read_bps(i).unwrap();
        let v1 = table.read_bps(i + 1).unwrap();
        for offset_ms in [1i64, 7_000, 30_000, 59_999] {
            let t = t0() + Duration::seconds(60 * i as i64) + Duration::milliseconds(offset_ms);
            let v = table.lookup_bps(t).unwrap();
            assert!(v0.min(v1) <= v && v <= v0.max(v1), "sample {i} +{offset_ms}ms: {v}");
        }
    }
}

/// Test instants outside coverage are range errors
#[test]
fn test_range_rejected_on_both_sides() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = EncodeConfig::new(t0(), t0() + Duration::minutes(20), dir.path());
    Encoder::new(Wobble::default()).encode(&cfg).unwrap();

    for name in ["gtab_1s.bin", "gtab_60s.bin"] {
        let table = Table::open(dir.path().join(name)).unwrap();
        let (start, end) = table.coverage();
        assert!(table.lookup_bps(start).is_ok());
        assert!(table.lookup_bps(end).is_ok());

        for t in [start - Duration::milliseconds(1), end + Duration::milliseconds(1)] {
            let err = table.lookup_bps(t).unwrap_err();
            assert!(matches!(err, TableError::OutOfRange { .. }), "{name}: {err}");
        }
    }
}

/// Test float fields interpolate without rounding
#[test]
fn test_float_field_interpolation() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = EncodeConfig::new(t0(), t0() + Duration::minutes(10), dir.path())
        .with_field_mask(FieldMask(0x3f));
    Encoder::new(Wobble::default()).encode(&cfg).unwrap();
    let table = Table::open(dir.path().join("gtab_60s.bin")).unwrap();

    let a = table.read_f32(Field::MoonRkm, 2).unwrap() as f64;
    let b = table.read_f32(Field::MoonRkm, 3).unwrap() as f64;
    let mid = table
        .lookup_field(Field::MoonRkm, t0() + Duration::seconds(150))
        .unwrap();
    assert!((mid - (a + b) / 2.0).abs() < 1e-6);
}

/// Test concurrent readers on one shared table
#[test]
fn test_concurrent_readers_share_one_handle() {
    let dir = tempfile::tempdir().unwrap();
    let values: Vec<u16> = (0..500u16).map(|i| (i * 17) % 10_001).collect();
    let table = Arc::new(Table::open(write_bps(dir.path(), "c.bin", &values)).unwrap());
    let values = Arc::new(values);

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let table = Arc::clone(&table);
            let values = Arc::clone(&values);
            std::thread::spawn(move || {
                for i in (worker..values.len()).step_by(3) {
                    let t = t0() + Duration::seconds(i as i64);
                    assert_eq!(table.lookup_bps(t).unwrap(), values[i]);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

// =============================================================================
// HEADER REJECTION
// =============================================================================

/// Test malformed headers are rejected at open
#[test]
fn test_malformed_headers_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let good = TableHeader::new(T0, SECOND_NS, 4, FieldMask::DEFAULT);

    let mut variants: Vec<(&str, [u8; 47])> = Vec::new();

    let mut bytes = good.to_bytes();
    bytes[0..5].copy_from_slice(b"GTAB2");
    variants.push(("magic", bytes));

    for version in [0u16, 2, u16::MAX] {
        let mut bytes = good.to_bytes();
        bytes[5..7].copy_from_slice(&version.to_le_bytes());
        variants.push(("version", bytes));
    }

    for interval in [0i64, -SECOND_NS] {
        let mut h = good;
        h.interval_ns = interval;
        variants.push(("interval", h.to_bytes()));
    }

    let mut h = good;
    h.count = 0;
    variants.push(("count", h.to_bytes()));

    for (what, header) in variants {
        let path = dir.path().join(format!("{what}.bin"));
        let mut file = header.to_vec();
        file.extend_from_slice(&[0u8; 4 * 6]);
        std::fs::write(&path, file).unwrap();

        let err = Table::open(&path).unwrap_err();
        assert!(err.is_format_error(), "{what}: {err}");
    }
}

/// Test the version error names the offending version
#[test]
fn test_version_error_names_the_version() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = TableHeader::new(T0, SECOND_NS, 1, FieldMask::DEFAULT).to_bytes();
    bytes[5..7].copy_from_slice(&2u16.to_le_bytes());
    let path = dir.path().join("v2.bin");
    let mut file = bytes.to_vec();
    file.extend_from_slice(&[0u8; 6]);
    std::fs::write(&path, file).unwrap();

    let err = Table::open(&path).unwrap_err();
    assert_eq!(err.to_string(), "unsupported GTAB version: 2");
}
