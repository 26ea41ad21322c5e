//! Batch driver: runs the matcher over every record of a batch, saving
//! checkpoints along the way so an interrupted run can pick up where it
//! stopped.

use crate::checkpoint::CheckpointStore;
use crate::config::ScanConfig;
use crate::error::MatchError;
use crate::matcher::Matcher;
use crate::model::{RecordBatch, ScanSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Save the whole batch after this many processed records.
    pub checkpoint_interval: usize,
    /// Report progress after this many processed records.
    pub progress_every: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            checkpoint_interval: 500,
            progress_every: 5,
        }
    }
}

impl From<&ScanConfig> for ScanOptions {
    fn from(config: &ScanConfig) -> Self {
        Self {
            checkpoint_interval: config.checkpoint_interval.max(1),
            progress_every: config.progress_every.max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    pub processed: usize,
    pub total: usize,
}

pub struct Scanner<'a, S: CheckpointStore + ?Sized> {
    matcher: &'a Matcher<'a>,
    store: &'a S,
    options: ScanOptions,
}

impl<'a, S: CheckpointStore + ?Sized> Scanner<'a, S> {
    pub fn new(matcher: &'a Matcher<'a>, store: &'a S, options: ScanOptions) -> Self {
        Self {
            matcher,
            store,
            options,
        }
    }

    /// Classify every unresolved record in `batch`, checkpointing under `key`.
    ///
    /// Progress is reported as `0/total` up front, then every
    /// `progress_every` records and once at the end. The final batch is
    /// saved once more after the loop, so a completed scan always leaves a
    /// checkpoint with every record resolved.
    pub fn scan<F>(
        &self,
        key: &str,
        batch: &mut RecordBatch,
        mut on_progress: F,
    ) -> Result<ScanSummary, MatchError>
    where
        F: FnMut(ScanProgress),
    {
        let total = batch.records.len();
        let mut summary = ScanSummary {
            total,
            ..ScanSummary::default()
        };
        log::info!(
            "scanning {total} {} record(s) against {} catalog product(s)",
            batch.kind,
            self.matcher.catalog().len()
        );

        on_progress(ScanProgress { processed: 0, total });

        for i in 0..total {
            let outcome = self.matcher.classify(&mut batch.records[i]);
            summary.record(&outcome);

            let processed = i + 1;
            if processed % self.options.progress_every == 0 || processed == total {
                on_progress(ScanProgress { processed, total });
            }
            if processed % self.options.checkpoint_interval == 0 && processed < total {
                self.store.save(key, batch)?;
                summary.checkpoints_written += 1;
                log::debug!("checkpoint '{key}' at {processed}/{total}");
            }
        }

        self.store.save(key, batch)?;
        summary.checkpoints_written += 1;

        log::info!(
            "{} scan done: {} matched, {} with candidates, {} unresolved, {} skipped",
            batch.kind,
            summary.matched,
            summary.with_candidates,
            summary.unresolved,
            summary.skipped
        );
        Ok(summary)
    }
}
