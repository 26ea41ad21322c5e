//! `skumatch-recon` — catalog reconciliation engine.
//!
//! Pure engine crate: takes parsed rows, normalizes them into records,
//! matches records against the catalog and hands review pages and export
//! groups to sinks. Spreadsheet and filesystem access live in `skumatch-io`.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod export;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod rejected;
pub mod report;
pub mod scan;
pub mod similarity;
pub mod stats;

pub use checkpoint::{resume_or_build, CheckpointStore, MemoryStore};
pub use config::MatchConfig;
pub use error::{MatchError, RecordError};
pub use export::{ExportGroup, ExportSink};
pub use matcher::Matcher;
pub use model::{
    CatalogProduct, OperationKind, OperationRecord, Period, RawValue, RecordBatch, RejectedRow,
    SourceRow,
};
pub use normalize::Normalizer;
pub use report::{ReviewPage, ReviewReporter, ReviewSink};
pub use scan::{ScanOptions, ScanProgress, Scanner};
pub use similarity::similarity;
pub use stats::BatchStats;
