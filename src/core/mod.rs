//! Core modules for GTAB

pub mod encoder;
pub mod ephemeris;
pub mod normalize;
pub mod persist;
pub mod signal;
pub mod stats;
pub mod table;
pub mod validator;

pub use encoder::{
    dataset_id, load_meta, sample_times, save_meta, table_file_name, write_table, EncodeConfig,
    EncodeOutput, EncodedTable, Encoder,
};
pub use ephemeris::{positions_checked, LowPrecisionEphemeris, PositionProvider};
pub use normalize::{normalize, BpsScale};
pub use signal::{signal_terms, terms_for, tidal_proxy, SignalTerms};
pub use stats::{align_peaks, detect_peaks, percentile, summarize, PeakAlignment};
pub use table::Table;
pub use validator::{
    compare_series, load_thresholds, passes, resolve_dataset_id, save_report, ValidationConfig,
    Validator,
};
