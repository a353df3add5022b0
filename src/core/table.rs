//! GTAB lookup engine
//!
//! `Table::open` validates the header and derives the record layout once.
//! Every lookup afterwards costs O(1) positioned reads: a record's offset is
//! `HEADER_SIZE + index * width + field_offset`. Reads never move a shared
//! cursor, so one `&Table` can serve any number of readers.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::types::{Field, RecordLayout, TableError, TableHeader};
use crate::{BPS_MAX, HEADER_SIZE};

/// Open handle on one immutable GTAB file
///
/// The file is closed when the handle drops.
#[derive(Debug)]
pub struct Table {
    file: File,
    path: PathBuf,
    header: TableHeader,
    layout: RecordLayout,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Table {
    /// Open and validate a table
    ///
    /// Rejects bad magic, unsupported versions, non-positive interval, zero
    /// count, empty or unknown field masks and files shorter than the
    /// header plus `count` records.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let have = file.metadata()?.len();

        if have < HEADER_SIZE as u64 {
            return Err(TableError::Truncated {
                have,
                expected: HEADER_SIZE as u64,
            });
        }

        let mut buf = [0u8; HEADER_SIZE];
        file.read_exact(&mut buf)?;
        let header = TableHeader::from_bytes(&buf)?;
        let layout = header.field_mask.layout()?;

        let expected = HEADER_SIZE as u64 + u64::from(header.count) * layout.width() as u64;
        if have < expected {
            return Err(TableError::Truncated { have, expected });
        }

        let (start, end) = header.coverage()?;
        debug!(
            path = %path.display(),
            count = header.count,
            interval_ns = header.interval_ns,
            mask = %header.field_mask,
            %start,
            %end,
            "opened GTAB table"
        );

        Ok(Self {
            file,
            path: path.to_path_buf(),
            header,
            layout,
            start,
            end,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &TableHeader {
        &self.header
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    /// Number of records
    pub fn len(&self) -> u32 {
        self.header.count
    }

    /// Always false: an open table holds at least one record
    pub fn is_empty(&self) -> bool {
        self.header.count == 0
    }

    /// Inclusive covered span
    pub fn coverage(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start, self.end)
    }

    /// Timestamp of record `index`
    pub fn sample_time(&self, index: u64) -> Result<DateTime<Utc>, TableError> {
        self.check_index(index)?;
        let offset_ns = (index as i64)
            .checked_mul(self.header.interval_ns)
            .ok_or(TableError::IndexOutOfRange {
                index,
                count: self.header.count,
            })?;
        Ok(self.start + Duration::nanoseconds(offset_ns))
    }

    /// Record index and fraction toward the next record for `t`
    ///
    /// Exact integer nanosecond arithmetic: `t` must satisfy
    /// `start <= t <= end`, otherwise this is a range error.
    pub fn index_for(&self, t: DateTime<Utc>) -> Result<(u64, f64), TableError> {
        let out_of_range = || TableError::OutOfRange {
            at: t,
            start: self.start,
            end: self.end,
        };

        let delta_ns = (t - self.start).num_nanoseconds().ok_or_else(out_of_range)?;
        if delta_ns < 0 {
            return Err(out_of_range());
        }

        let interval = self.header.interval_ns;
        let index = (delta_ns / interval) as u64;
        let rem = delta_ns % interval;
        let last = u64::from(self.header.count) - 1;
        if index > last || (index == last && rem > 0) {
            return Err(out_of_range());
        }

        Ok((index, rem as f64 / interval as f64))
    }

    /// Stored basis-point value of record `index`
    pub fn read_bps(&self, index: u64) -> Result<u16, TableError> {
        let mut buf = [0u8; 2];
        self.read_field(Field::TideBps, index, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Stored value of any field of record `index` (bps widened)
    pub fn read_f32(&self, field: Field, index: u64) -> Result<f32, TableError> {
        if field == Field::TideBps {
            return self.read_bps(index).map(f32::from);
        }
        let mut buf = [0u8; 4];
        self.read_field(field, index, &mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }

    /// Interpolated basis points at `t`
    ///
    /// Exact sample instants return the stored value untouched. Between
    /// samples the result is `round(v0 + (v1 - v0) * frac)`, clamped to
    /// `[0, BPS_MAX]`. Never extrapolates.
    pub fn lookup_bps(&self, t: DateTime<Utc>) -> Result<u16, TableError> {
        let (index, frac) = self.index_for(t)?;
        let v0 = self.read_bps(index)?;
        if frac == 0.0 {
            return Ok(v0);
        }

        let v1 = self.read_bps(self.next_index(index))?;
        let v = f64::from(v0) + (f64::from(v1) - f64::from(v0)) * frac;
        Ok(v.round().clamp(0.0, f64::from(BPS_MAX)) as u16)
    }

    /// Linearly interpolated value of any present field at `t`, unrounded
    pub fn lookup_field(&self, field: Field, t: DateTime<Utc>) -> Result<f64, TableError> {
        let (index, frac) = self.index_for(t)?;
        let v0 = f64::from(self.read_f32(field, index)?);
        if frac == 0.0 {
            return Ok(v0);
        }
        let v1 = f64::from(self.read_f32(field, self.next_index(index))?);
        Ok(v0 + (v1 - v0) * frac)
    }

    fn next_index(&self, index: u64) -> u64 {
        (index + 1).min(u64::from(self.header.count) - 1)
    }

    fn check_index(&self, index: u64) -> Result<(), TableError> {
        if index >= u64::from(self.header.count) {
            return Err(TableError::IndexOutOfRange {
                index,
                count: self.header.count,
            });
        }
        Ok(())
    }

    fn read_field(&self, field: Field, index: u64, buf: &mut [u8]) -> Result<(), TableError> {
        let field_offset = self
            .layout
            .offset_of(field)
            .ok_or(TableError::FieldAbsent(field))?;
        self.check_index(index)?;

        let offset =
            HEADER_SIZE as u64 + index * self.layout.width() as u64 + field_offset as u64;
        read_exact_at(&self.file, buf, offset)?;
        Ok(())
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut std::mem::take(&mut buf)[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
