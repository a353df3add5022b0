//! GTAB encoder
//!
//! One configuration produces both cadence tables plus the metadata sidecar:
//! 1. sample grid `start, start+cadence, … ≤ end`
//! 2. one batched provider query per cadence
//! 3. signal per sample, batch normalization to basis points
//! 4. header + records written via temp file and rename
//!
//! All windows are checked before the first byte is written.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, DurationRound, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::core::ephemeris::{positions_checked, PositionProvider};
use crate::core::normalize::BpsScale;
use crate::core::persist::write_atomic;
use crate::core::signal::terms_for;
use crate::types::{DatasetMeta, EncodeError, FieldMask, SampleRecord, TableHeader};
use crate::{
    DATASET_ID_LEN, DATASET_ID_SALT, ENCODE_CADENCES_SECS, FORMAT_VERSION, HEADER_SIZE, META_FILE,
    TABLE_1S_FILE, TABLE_60S_FILE,
};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// What to encode and where
#[derive(Debug, Clone)]
pub struct EncodeConfig {
    /// Window start; the tables truncate it to whole seconds (the header
    /// epoch), the sidecar keeps it as given
    pub start: DateTime<Utc>,
    /// Inclusive window end
    pub end: DateTime<Utc>,
    pub out_dir: PathBuf,
    pub field_mask: FieldMask,
}

impl EncodeConfig {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            start,
            end,
            out_dir: out_dir.into(),
            field_mask: FieldMask::DEFAULT,
        }
    }

    pub fn with_field_mask(mut self, field_mask: FieldMask) -> Self {
        self.field_mask = field_mask;
        self
    }
}

/// One written table
#[derive(Debug, Clone)]
pub struct EncodedTable {
    pub cadence_secs: u32,
    pub path: PathBuf,
    pub header: TableHeader,
    /// Percentile basis used for this table's basis points
    pub scale: BpsScale,
}

/// Everything one encode run produced
#[derive(Debug, Clone)]
pub struct EncodeOutput {
    pub tables: Vec<EncodedTable>,
    pub meta: DatasetMeta,
    pub meta_path: PathBuf,
}

/// Encoder bound to one position provider
pub struct Encoder<P> {
    provider: P,
}

impl<P: PositionProvider> Encoder<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Encode both cadence tables and the sidecar
    pub fn encode(&self, config: &EncodeConfig) -> Result<EncodeOutput, EncodeError> {
        let start = truncate_to_second(config.start);
        let end = config.end;
        config.field_mask.layout()?;

        // Reject every cadence up front so a failure leaves no partial output
        for cadence_secs in ENCODE_CADENCES_SECS {
            sample_count(start, end, cadence_secs)?;
        }

        let mut tables = Vec::with_capacity(ENCODE_CADENCES_SECS.len());
        for cadence_secs in ENCODE_CADENCES_SECS {
            let (header, records, scale) =
                self.build_table(start, end, cadence_secs, config.field_mask)?;
            let path = config.out_dir.join(table_file_name(cadence_secs));
            write_table(&path, &header, &records)?;
            info!(
                cadence_secs,
                count = header.count,
                mask = %header.field_mask,
                path = %path.display(),
                "wrote GTAB table"
            );
            tables.push(EncodedTable {
                cadence_secs,
                path,
                header,
                scale,
            });
        }

        let kernel = self.provider.identity();
        let meta = DatasetMeta {
            dataset_id: dataset_id(&kernel, config.start, config.end, config.field_mask),
            kernel,
            start: config.start,
            end: config.end,
            fields_mask: config.field_mask,
            version: FORMAT_VERSION,
            created_at: Utc::now(),
        };
        let meta_path = config.out_dir.join(META_FILE);
        save_meta(&meta, &meta_path)?;
        info!(dataset_id = %meta.dataset_id, path = %meta_path.display(), "wrote metadata");

        Ok(EncodeOutput {
            tables,
            meta,
            meta_path,
        })
    }

    /// Header and records for one cadence, not yet written
    pub fn build_table(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cadence_secs: u32,
        field_mask: FieldMask,
    ) -> Result<(TableHeader, Vec<SampleRecord>, BpsScale), EncodeError> {
        let start = truncate_to_second(start);
        let count = sample_count(start, end, cadence_secs)?;
        let times = sample_times(start, end, cadence_secs);
        debug!(cadence_secs, samples = times.len(), "querying positions");

        let positions = positions_checked(&self.provider, &times)?;
        let terms = positions
            .iter()
            .map(terms_for)
            .collect::<Result<Vec<_>, _>>()?;
        drop(positions);

        let raw: Vec<f64> = terms.iter().map(|t| t.raw).collect();
        let scale = BpsScale::fit(&raw)?;
        debug!(cadence_secs, p5 = scale.p5, p95 = scale.p95, "fitted bps scale");

        let records = terms
            .iter()
            .map(|t| SampleRecord {
                tide_bps: scale.to_bps(t.raw),
                tide_raw: t.raw as f32,
                moon_rkm: t.moon_km as f32,
                sun_rkm: t.sun_km as f32,
                moon_rinv3: t.moon_rinv3 as f32,
                sun_rinv3: t.sun_rinv3 as f32,
            })
            .collect();

        let header = TableHeader::new(
            start.timestamp(),
            i64::from(cadence_secs) * NANOS_PER_SECOND,
            count,
            field_mask,
        );
        Ok((header, records, scale))
    }
}

/// Canonical file name for a cadence
pub fn table_file_name(cadence_secs: u32) -> String {
    match cadence_secs {
        1 => TABLE_1S_FILE.to_string(),
        60 => TABLE_60S_FILE.to_string(),
        other => format!("gtab_{other}s.bin"),
    }
}

/// Inclusive grid `start, start+cadence, … ≤ end` (cadence 0 treated as 1)
pub fn sample_times(start: DateTime<Utc>, end: DateTime<Utc>, cadence_secs: u32) -> Vec<DateTime<Utc>> {
    let step = Duration::seconds(i64::from(cadence_secs.max(1)));
    let mut times = Vec::new();
    let mut t = start;
    while t <= end {
        times.push(t);
        t = match t.checked_add_signed(step) {
            Some(next) => next,
            None => break,
        };
    }
    times
}

/// Number of grid samples, rejecting windows shorter than one cadence step
fn sample_count(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    cadence_secs: u32,
) -> Result<u32, EncodeError> {
    let step = Duration::seconds(i64::from(cadence_secs.max(1)));
    let span = end - start;
    if span < step {
        return Err(EncodeError::WindowTooShort {
            start,
            end,
            cadence_secs,
        });
    }

    let count = (span.num_milliseconds() / step.num_milliseconds()) as u64 + 1;
    u32::try_from(count).map_err(|_| EncodeError::TooManySamples {
        cadence_secs,
        count,
    })
}

fn truncate_to_second(t: DateTime<Utc>) -> DateTime<Utc> {
    t.duration_trunc(Duration::seconds(1)).unwrap_or(t)
}

/// Serialize a table to `path` atomically
///
/// The header must decode cleanly and declare exactly `records.len()`
/// records; a table that could not be opened again is never written.
pub fn write_table(
    path: &Path,
    header: &TableHeader,
    records: &[SampleRecord],
) -> Result<(), EncodeError> {
    let header_bytes = header.to_bytes();
    TableHeader::from_bytes(&header_bytes)?;
    let layout = header.field_mask.layout()?;

    if records.len() != header.count as usize {
        return Err(EncodeError::RecordCount {
            declared: header.count,
            supplied: records.len(),
        });
    }

    let mut bytes = Vec::with_capacity(HEADER_SIZE + records.len() * layout.width());
    bytes.extend_from_slice(&header_bytes);
    for record in records {
        layout.write_record(record, &mut bytes);
    }

    write_atomic(path, &bytes).map_err(|source| EncodeError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Fingerprint of kernel identity, window and field mask (12 hex chars)
pub fn dataset_id(
    kernel: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    field_mask: FieldMask,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kernel.as_bytes());
    hasher.update(start.to_rfc3339().as_bytes());
    hasher.update(end.to_rfc3339().as_bytes());
    hasher.update(field_mask.bits().to_string().as_bytes());
    hasher.update(DATASET_ID_SALT);
    let digest: [u8; 32] = hasher.finalize().into();

    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..DATASET_ID_LEN].to_string()
}

/// Write the sidecar as pretty JSON with a trailing newline
pub fn save_meta(meta: &DatasetMeta, path: &Path) -> Result<(), EncodeError> {
    let mut json = serde_json::to_string_pretty(meta)?;
    json.push('\n');
    write_atomic(path, json.as_bytes()).map_err(|source| EncodeError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a sidecar back
pub fn load_meta(path: &Path) -> Result<DatasetMeta, EncodeError> {
    let json = std::fs::read_to_string(path).map_err(|source| EncodeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&json)?)
}

// =============================================================================
// TESTS
// =============================================================================
