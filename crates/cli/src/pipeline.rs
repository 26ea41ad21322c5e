//! Glue between the config file, the io crate and the engine.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use skumatch_io::{discover, read_rows, JsonFileStore, SourceClassifier, XlsxExportSink, XlsxReviewSink};
use skumatch_recon::checkpoint::{resume_or_build, CheckpointStore};
use skumatch_recon::export::export_matched;
use skumatch_recon::model::{CatalogProduct, OperationKind, RecordBatch, RejectedRow};
use skumatch_recon::normalize::{load_catalog, Normalizer};
use skumatch_recon::scan::{ScanOptions, Scanner};
use skumatch_recon::stats::BatchStats;
use skumatch_recon::{MatchConfig, MatchError, Matcher, ReviewReporter};

pub const NO_CHECKPOINT: &str = "no checkpoint found";

/// A loaded config plus the directory its relative paths resolve against.
pub struct Workspace {
    pub config: MatchConfig,
    base_dir: PathBuf,
}

impl Workspace {
    pub fn load(config_path: &Path) -> Result<Self, MatchError> {
        let text = std::fs::read_to_string(config_path).map_err(|e| {
            MatchError::ConfigParse(format!("cannot read {}: {e}", config_path.display()))
        })?;
        let config = MatchConfig::from_toml(&text)?;
        let base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self { config, base_dir })
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.base_dir.join(relative)
    }

    pub fn store(&self) -> JsonFileStore {
        JsonFileStore::new(self.path(&self.config.scan.checkpoint_dir))
    }

    pub fn load_catalog(&self) -> Result<Vec<CatalogProduct>, MatchError> {
        let catalog = &self.config.catalog;
        let path = self.path(&catalog.file);
        let rows = read_rows(&path, catalog.header_row).map_err(MatchError::CatalogLoad)?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| catalog.file.clone());
        let loaded = load_catalog(&source, &rows, &catalog.columns)?;
        self.write_rejected(&[source], &loaded.rejected)?;
        Ok(loaded.items)
    }

    /// Read and normalize every source file of `kind`.
    pub fn build_batch(&self, kind: OperationKind) -> Result<RecordBatch, MatchError> {
        let sources = &self.config.sources;
        let classifier = SourceClassifier::new(&sources.incoming_keyword, &sources.outgoing_keyword);
        let files: Vec<_> = discover(&self.path(&sources.root), &classifier)
            .map_err(MatchError::Io)?
            .into_iter()
            .filter(|f| f.kind == kind)
            .collect();
        log::info!("{kind}: {} source file(s)", files.len());

        let normalizer = Normalizer::new(&self.config.normalize);
        let columns = self.config.columns.for_kind(kind);
        let mut records = Vec::new();
        let mut rejected = Vec::new();
        for file in &files {
            let rows = read_rows(&file.path, sources.header_row).map_err(MatchError::Io)?;
            let normalized = normalizer.normalize_rows(kind, &file.name(), file.period, &rows, columns);
            records.extend(normalized.items);
            rejected.extend(normalized.rejected);
        }
        let names: Vec<String> = files.iter().map(|f| f.name()).collect();
        self.write_rejected(&names, &rejected)?;
        Ok(RecordBatch::new(kind, records))
    }

    /// Replace the rejected-row listings of `sources` with `rejected`.
    fn write_rejected(&self, sources: &[String], rejected: &[RejectedRow]) -> Result<(), MatchError> {
        let dir = self.path(&self.config.output.errors_dir);
        skumatch_io::rejected::remove_listings(&dir, sources).map_err(MatchError::Io)?;
        let written = skumatch_io::rejected::write_listings(&dir, rejected).map_err(MatchError::Io)?;
        if !written.is_empty() {
            log::warn!(
                "{} rejected row(s), listed under {}",
                rejected.len(),
                dir.display()
            );
        }
        Ok(())
    }

    /// Load the finished batch of `kind`. A missing checkpoint is an error:
    /// reporting and exporting need a match run first.
    pub fn checkpointed_batch(&self, kind: OperationKind) -> Result<RecordBatch, MatchError> {
        self.store()
            .load(kind.checkpoint_key())?
            .ok_or_else(|| MatchError::Checkpoint {
                key: kind.checkpoint_key().to_string(),
                message: NO_CHECKPOINT.into(),
            })
    }
}

/// Load (or build) and scan the batch of `kind`. Returns the scanned batch.
pub fn match_kind(
    ws: &Workspace,
    catalog: &[CatalogProduct],
    kind: OperationKind,
    reload: bool,
    show_progress: bool,
) -> Result<RecordBatch, MatchError> {
    let store = ws.store();
    let key = kind.checkpoint_key();
    if reload {
        store.clear(key)?;
    }
    let (mut batch, resumed) = resume_or_build(&store, key, || ws.build_batch(kind))?;
    if !resumed {
        // persist the normalized batch before the first classification
        store.save(key, &batch)?;
    }

    let matcher = Matcher::new(catalog, ws.config.thresholds);
    let scanner = Scanner::new(&matcher, &store, ScanOptions::from(&ws.config.scan));
    let bar = progress_bar(batch.records.len(), kind, show_progress);
    let summary = scanner.scan(key, &mut batch, |p| bar.set_position(p.processed as u64))?;
    bar.finish_and_clear();

    eprintln!(
        "{kind}: {} record(s), {} matched, {} with candidates, {} unresolved ({} already done)",
        summary.total, summary.matched, summary.with_candidates, summary.unresolved, summary.skipped
    );
    Ok(batch)
}

fn progress_bar(total: usize, kind: OperationKind, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
    {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar.set_message(format!("matching {kind} records"));
    bar
}

/// Write review pages for `batch`. Returns the files written.
pub fn report_kind(ws: &Workspace, batch: &RecordBatch) -> Result<Vec<PathBuf>, MatchError> {
    let mut sink = XlsxReviewSink::new(ws.path(&ws.config.report.output_dir));
    ReviewReporter::from_config(&ws.config.report).write(batch, &mut sink)?;
    Ok(sink.written().to_vec())
}

/// Write matched-record workbooks for `batch`. Returns the files written.
pub fn export_kind(ws: &Workspace, batch: &RecordBatch) -> Result<Vec<PathBuf>, MatchError> {
    let mut sink = XlsxExportSink::new(ws.path(&ws.config.output.export_dir));
    export_matched(batch, &mut sink)?;
    Ok(sink.written().to_vec())
}

pub fn stats_of(batches: &[RecordBatch]) -> Vec<BatchStats> {
    batches.iter().map(BatchStats::of).collect()
}
