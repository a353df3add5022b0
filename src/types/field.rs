//! Per-sample fields and the record layout derived from a field mask
//!
//! Bit order is record order: the lowest set bit is written first.

use serde::{Deserialize, Serialize};
use crate::types::TableError;

/// One per-sample field that a table may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Normalized proxy, basis points [0, 10000]
    TideBps,
    /// Unnormalized proxy (μ/r³ summed)
    TideRaw,
    /// Earth–Moon distance (km)
    MoonRkm,
    /// Earth–Sun distance (km)
    SunRkm,
    /// 1/r³ of the Moon distance
    MoonRinv3,
    /// 1/r³ of the Sun distance
    SunRinv3,
}

impl Field {
    /// All fields in mask-bit order
    pub const ALL: [Field; 6] = [
        Field::TideBps,
        Field::TideRaw,
        Field::MoonRkm,
        Field::SunRkm,
        Field::MoonRinv3,
        Field::SunRinv3,
    ];

    /// Mask bit selecting this field
    pub fn bit(&self) -> u32 {
        match self {
            Self::TideBps => 0x01,
            Self::TideRaw => 0x02,
            Self::MoonRkm => 0x04,
            Self::SunRkm => 0x08,
            Self::MoonRinv3 => 0x10,
            Self::SunRinv3 => 0x20,
        }
    }

    /// Encoded width in bytes
    pub fn width(&self) -> usize {
        match self {
            Self::TideBps => 2,
            _ => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TideBps => "tide_bps",
            Self::TideRaw => "tide_raw",
            Self::MoonRkm => "moon_rkm",
            Self::SunRkm => "sun_rkm",
            Self::MoonRinv3 => "moon_rinv3",
            Self::SunRinv3 => "sun_rinv3",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Bitset selecting which fields each record carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMask(pub u32);

impl FieldMask {
    /// Every bit the format knows about
    pub const KNOWN_BITS: u32 = 0x3f;

    /// tide_bps | tide_raw
    pub const DEFAULT: FieldMask = FieldMask(0x03);

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0 & field.bit() != 0
    }

    /// Build a mask from a list of fields
    pub fn from_fields(fields: &[Field]) -> Self {
        Self(fields.iter().fold(0, |acc, f| acc | f.bit()))
    }

    /// Present fields, lowest bit first
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL.into_iter().filter(move |f| self.contains(*f))
    }

    /// Derive the fixed record layout for this mask
    ///
    /// Rejects masks with unknown bits (their width is unknowable) and
    /// masks that select nothing.
    pub fn layout(&self) -> Result<RecordLayout, TableError> {
        let unknown = self.0 & !Self::KNOWN_BITS;
        if unknown != 0 {
            return Err(TableError::UnknownFields(unknown));
        }

        let mut slots = Vec::new();
        let mut offset = 0;
        for field in self.fields() {
            slots.push(FieldSlot { field, offset });
            offset += field.width();
        }

        if slots.is_empty() {
            return Err(TableError::EmptyLayout);
        }

        Ok(RecordLayout {
            mask: *self,
            slots,
            width: offset,
        })
    }
}

impl Default for FieldMask {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for FieldMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// Field position inside one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlot {
    pub field: Field,
    /// Byte offset from record start
    pub offset: usize,
}

/// Ordered field descriptors for one table, computed once per mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    mask: FieldMask,
    slots: Vec<FieldSlot>,
    width: usize,
}

impl RecordLayout {
    pub fn mask(&self) -> FieldMask {
        self.mask
    }

    pub fn slots(&self) -> &[FieldSlot] {
        &self.slots
    }

    /// Bytes per record
    pub fn width(&self) -> usize {
        self.width
    }

    /// Offset of `field` within a record, if present
    pub fn offset_of(&self, field: Field) -> Option<usize> {
        self.slots.iter().find(|s| s.field == field).map(|s| s.offset)
    }

    /// Serialize one record (little-endian) into `out`
    pub fn write_record(&self, record: &SampleRecord, out: &mut Vec<u8>) {
        for slot in &self.slots {
            match slot.field {
                Field::TideBps => out.extend_from_slice(&record.tide_bps.to_le_bytes()),
                field => out.extend_from_slice(&record.value_f32(field).to_le_bytes()),
            }
        }
    }
}

/// All per-sample values the encoder can produce
///
/// Only the fields selected by the mask reach the file.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SampleRecord {
    pub tide_bps: u16,
    pub tide_raw: f32,
    pub moon_rkm: f32,
    pub sun_rkm: f32,
    pub moon_rinv3: f32,
    pub sun_rinv3: f32,
}

impl SampleRecord {
    /// Record carrying only a basis-point value
    pub fn bps(tide_bps: u16) -> Self {
        Self {
            tide_bps,
            ..Self::default()
        }
    }

    /// Value of a float field (tide_bps is widened)
    pub fn value_f32(&self, field: Field) -> f32 {
        match field {
            Field::TideBps => self.tide_bps as f32,
            Field::TideRaw => self.tide_raw,
            Field::MoonRkm => self.moon_rkm,
            Field::SunRkm => self.sun_rkm,
            Field::MoonRinv3 => self.moon_rinv3,
            Field::SunRinv3 => self.sun_rinv3,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let layout = FieldMask::DEFAULT.layout().unwrap();
        assert_eq!(layout.width(), 6);
        assert_eq!(layout.offset_of(Field::TideBps), Some(0));
        assert_eq!(layout.offset_of(Field::TideRaw), Some(2));
        assert_eq!(layout.offset_of(Field::SunRkm), None);
    }

    #[test]
    fn test_full_layout_order() {
        let layout = FieldMask(0x3f).layout().unwrap();
        let order: Vec<Field> = layout.slots().iter().map(|s| s.field).collect();
        assert_eq!(order, Field::ALL.to_vec());
        assert_eq!(layout.width(), 2 + 5 * 4);
        assert_eq!(layout.offset_of(Field::SunRinv3), Some(18));
    }

    #[test]
    fn test_sparse_mask_offsets() {
        // raw + sun distance only: no bps slot ahead of them
        let layout = FieldMask::from_fields(&[Field::SunRkm, Field::TideRaw]).layout().unwrap();
        assert_eq!(layout.offset_of(Field::TideRaw), Some(0));
        assert_eq!(layout.offset_of(Field::SunRkm), Some(4));
        assert_eq!(layout.width(), 8);
    }

    #[test]
    fn test_empty_mask_rejected() {
        assert!(matches!(FieldMask(0).layout(), Err(TableError::EmptyLayout)));
    }

    #[test]
    fn test_unknown_bits_rejected() {
        assert!(matches!(
            FieldMask(0x41).layout(),
            Err(TableError::UnknownFields(0x40))
        ));
    }

    #[test]
    fn test_write_record_bytes() {
        let layout = FieldMask::DEFAULT.layout().unwrap();
        let record = SampleRecord {
            tide_bps: 0x1234,
            tide_raw: 1.5,
            ..SampleRecord::default()
        };
        let mut out = Vec::new();
        layout.write_record(&record, &mut out);
        assert_eq!(out.len(), 6);
        assert_eq!(&out[0..2], &[0x34, 0x12]);
        assert_eq!(&out[2..6], &1.5f32.to_le_bytes());
    }
}
