//! Error types for table I/O, encoding and validation
//!
//! Taxonomy:
//! - Format errors: the table header or layout cannot be trusted
//! - Range errors: one lookup fell outside the covered span
//! - Setup errors: the run cannot start (provider, window, unreadable path)

use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::Field;

/// Errors raised while opening or reading a GTAB table
#[derive(Debug, Error)]
pub enum TableError {
    #[error("invalid GTAB magic {0:?}")]
    BadMagic([u8; 5]),

    #[error("unsupported GTAB version: {0}")]
    UnsupportedVersion(u16),

    #[error("invalid interval_ns: {0}")]
    InvalidInterval(i64),

    #[error("empty table (count=0)")]
    EmptyTable,

    #[error("epoch {0} outside the representable time range")]
    InvalidEpoch(i64),

    #[error("table span overflows: {count} records at {interval_ns}ns")]
    SpanOverflow { count: u32, interval_ns: i64 },

    #[error("empty record layout (field_mask=0)")]
    EmptyLayout,

    #[error("unknown field mask bits 0x{0:x}")]
    UnknownFields(u32),

    #[error("truncated GTAB file: have {have} bytes, expected {expected}")]
    Truncated { have: u64, expected: u64 },

    #[error("timestamp {at} outside table coverage [{start}, {end}]")]
    OutOfRange {
        at: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("record index {index} outside table of {count} records")]
    IndexOutOfRange { index: u64, count: u32 },

    #[error("field {0} not present in table")]
    FieldAbsent(Field),

    #[error("table I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TableError {
    /// Header or layout cannot be decoded
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::BadMagic(_)
                | Self::UnsupportedVersion(_)
                | Self::InvalidInterval(_)
                | Self::EmptyTable
                | Self::InvalidEpoch(_)
                | Self::SpanOverflow { .. }
                | Self::EmptyLayout
                | Self::UnknownFields(_)
                | Self::Truncated { .. }
        )
    }

    /// Lookup outside the covered span
    pub fn is_range_error(&self) -> bool {
        matches!(self, Self::OutOfRange { .. } | Self::IndexOutOfRange { .. })
    }
}

/// Errors from the external position source
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("position provider unavailable: {0}")]
    Unavailable(String),

    #[error("position provider returned {actual} positions for {expected} timestamps")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Signal model precondition violations
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("{body} distance must be positive and finite, got {km} km")]
    InvalidDistance { body: &'static str, km: f64 },
}

/// Normalizer input errors
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("cannot normalize an empty batch")]
    EmptyBatch,

    #[error("non-finite value {value} at index {index}")]
    NonFinite { index: usize, value: f64 },
}

/// Errors that stop an encode run
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("window [{start}, {end}] is shorter than one {cadence_secs}s cadence step")]
    WindowTooShort {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cadence_secs: u32,
    },

    #[error("{count} samples at {cadence_secs}s cadence exceed the u32 record count")]
    TooManySamples { cadence_secs: u32, count: u64 },

    #[error("header declares {declared} records but {supplied} were supplied")]
    RecordCount { declared: u32, supplied: usize },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("metadata serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Setup failures of a validation run
///
/// Accuracy failures and early exits are reported in the metrics document,
/// never through this type.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("table {path} unreadable: {source}")]
    TableUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("read thresholds {path}: {source}")]
    Thresholds {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parse thresholds {path}: {source}")]
    ThresholdsFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("metrics serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
