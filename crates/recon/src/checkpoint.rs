use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::MatchError;
use crate::model::RecordBatch;

/// Keyed persistence for in-progress batches.
///
/// `save` must replace the previous blob for `key` all-or-nothing: after a
/// failed or interrupted save, `load` still returns the last batch that was
/// saved successfully.
pub trait CheckpointStore {
    fn save(&self, key: &str, batch: &RecordBatch) -> Result<(), MatchError>;
    fn load(&self, key: &str) -> Result<Option<RecordBatch>, MatchError>;
}

/// Load the checkpoint for `key`, or build a fresh batch when there is none.
/// Returns the batch and whether it was resumed.
pub fn resume_or_build<S, F>(store: &S, key: &str, build: F) -> Result<(RecordBatch, bool), MatchError>
where
    S: CheckpointStore + ?Sized,
    F: FnOnce() -> Result<RecordBatch, MatchError>,
{
    if let Some(batch) = store.load(key)? {
        let resolved = batch.records.iter().filter(|r| r.resolved).count();
        log::info!(
            "resuming '{key}' from checkpoint: {resolved}/{} record(s) already resolved",
            batch.records.len()
        );
        return Ok((batch, true));
    }
    Ok((build()?, false))
}

/// In-process store. Batches go through JSON so a round trip exercises the
/// same serialization as the on-disk store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RefCell<HashMap<String, String>>,
    saves: RefCell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves across all keys.
    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl CheckpointStore for MemoryStore {
    fn save(&self, key: &str, batch: &RecordBatch) -> Result<(), MatchError> {
        let blob = serde_json::to_string(batch).map_err(|e| MatchError::Checkpoint {
            key: key.into(),
            message: e.to_string(),
        })?;
        self.blobs.borrow_mut().insert(key.to_string(), blob);
        *self.saves.borrow_mut() += 1;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<RecordBatch>, MatchError> {
        match self.blobs.borrow().get(key) {
            Some(blob) => serde_json::from_str(blob)
                .map(Some)
                .map_err(|e| MatchError::Checkpoint {
                    key: key.into(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }
}
