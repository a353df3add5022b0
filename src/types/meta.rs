//! Metadata sidecar written next to encoded tables

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::FieldMask;

/// Provenance of one encode run (`gtab.meta.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMeta {
    /// Fingerprint over kernel, window and field mask
    pub dataset_id: String,
    /// Identity of the position source
    pub kernel: String,
    /// Requested window start
    pub start: DateTime<Utc>,
    /// Requested window end
    pub end: DateTime<Utc>,
    pub fields_mask: FieldMask,
    /// Format version of the tables
    pub version: u16,
    pub created_at: DateTime<Utc>,
}
