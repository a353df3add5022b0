//! GTAB v1 header
//!
//! Layout (47 bytes, little-endian):
//! - magic[5] "GTAB1"
//! - version u16
//! - epoch i64 (seconds, UTC)
//! - interval_ns i64 (> 0)
//! - count u32 (> 0)
//! - field_mask u32
//! - reserved[16] (zero)

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{FieldMask, TableError};
use crate::{FORMAT_VERSION, GTAB_MAGIC, HEADER_SIZE, RESERVED_SIZE};

/// Decoded table header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableHeader {
    /// Format version
    pub version: u16,
    /// First sample time (Unix seconds)
    pub epoch_secs: i64,
    /// Spacing between samples
    pub interval_ns: i64,
    /// Number of records
    pub count: u32,
    /// Fields present in each record
    pub field_mask: FieldMask,
}

impl TableHeader {
    /// Header for the current format version
    pub fn new(epoch_secs: i64, interval_ns: i64, count: u32, field_mask: FieldMask) -> Self {
        Self {
            version: FORMAT_VERSION,
            epoch_secs,
            interval_ns,
            count,
            field_mask,
        }
    }

    /// Serialize to exactly 47 bytes
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        let mut offset = 0;

        // magic (5 bytes)
        bytes[offset..offset + 5].copy_from_slice(&GTAB_MAGIC);
        offset += 5;

        // version (2 bytes)
        bytes[offset..offset + 2].copy_from_slice(&self.version.to_le_bytes());
        offset += 2;

        // epoch (8 bytes)
        bytes[offset..offset + 8].copy_from_slice(&self.epoch_secs.to_le_bytes());
        offset += 8;

        // interval_ns (8 bytes)
        bytes[offset..offset + 8].copy_from_slice(&self.interval_ns.to_le_bytes());
        offset += 8;

        // count (4 bytes)
        bytes[offset..offset + 4].copy_from_slice(&self.count.to_le_bytes());
        offset += 4;

        // field_mask (4 bytes)
        bytes[offset..offset + 4].copy_from_slice(&self.field_mask.bits().to_le_bytes());
        offset += 4;

        debug_assert_eq!(offset + RESERVED_SIZE, HEADER_SIZE);
        bytes
    }

    /// Decode and validate a header
    ///
    /// Never guesses: bad magic, other versions, non-positive interval and
    /// zero count are all rejected.
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Result<Self, TableError> {
        let mut magic = [0u8; 5];
        magic.copy_from_slice(&bytes[0..5]);
        if magic != GTAB_MAGIC {
            return Err(TableError::BadMagic(magic));
        }

        let version = u16::from_le_bytes([bytes[5], bytes[6]]);
        if version != FORMAT_VERSION {
            return Err(TableError::UnsupportedVersion(version));
        }

        let epoch_secs = i64::from_le_bytes(le_array(&bytes[7..15]));
        let interval_ns = i64::from_le_bytes(le_array(&bytes[15..23]));
        let count = u32::from_le_bytes(le_array(&bytes[23..27]));
        let field_mask = FieldMask(u32::from_le_bytes(le_array(&bytes[27..31])));

        if interval_ns <= 0 {
            return Err(TableError::InvalidInterval(interval_ns));
        }
        if count == 0 {
            return Err(TableError::EmptyTable);
        }

        let header = Self {
            version,
            epoch_secs,
            interval_ns,
            count,
            field_mask,
        };
        // Reject spans chrono cannot represent up front
        header.coverage()?;
        Ok(header)
    }

    /// First sample time
    pub fn start(&self) -> Result<DateTime<Utc>, TableError> {
        DateTime::<Utc>::from_timestamp(self.epoch_secs, 0)
            .ok_or(TableError::InvalidEpoch(self.epoch_secs))
    }

    /// Nanoseconds from first to last sample
    pub fn span_ns(&self) -> Result<i64, TableError> {
        i64::from(self.count.saturating_sub(1))
            .checked_mul(self.interval_ns)
            .ok_or(TableError::SpanOverflow {
                count: self.count,
                interval_ns: self.interval_ns,
            })
    }

    /// Inclusive covered span [start, end]
    pub fn coverage(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), TableError> {
        let start = self.start()?;
        let end = start
            .checked_add_signed(Duration::nanoseconds(self.span_ns()?))
            .ok_or(TableError::SpanOverflow {
                count: self.count,
                interval_ns: self.interval_ns,
            })?;
        Ok((start, end))
    }
}

fn le_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}

// =============================================================================
// TESTS
// =============================================================================
