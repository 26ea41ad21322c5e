// File I/O for skumatch: source sheets in, checkpoints and workbooks out

pub mod checkpoint;
pub mod csv;
pub mod discover;
pub mod export;
pub mod rejected;
pub mod review;
pub mod sheet;

pub use checkpoint::JsonFileStore;
pub use discover::{discover, SourceClassifier, SourceFile};
pub use export::XlsxExportSink;
pub use review::XlsxReviewSink;
pub use sheet::read_rows;
