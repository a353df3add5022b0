//! Core types for GTAB

mod error;
mod field;
mod header;
mod meta;
mod metrics;
mod positions;
mod thresholds;

pub use error::{
    EncodeError, NormalizeError, ProviderError, SignalError, TableError, ValidateError,
};
pub use field::{Field, FieldMask, FieldSlot, RecordLayout, SampleRecord};
pub use header::TableHeader;
pub use meta::DatasetMeta;
pub use metrics::{AccuracyStatistics, MetricsReport, Summary, ValidationReason};
pub use positions::GeocentricPositions;
pub use thresholds::Thresholds;
