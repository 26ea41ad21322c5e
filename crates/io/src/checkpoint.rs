// On-disk checkpoint store

use std::path::{Path, PathBuf};

use skumatch_recon::checkpoint::CheckpointStore;
use skumatch_recon::error::MatchError;
use skumatch_recon::model::RecordBatch;

/// One JSON file per key under `dir`. Saves go to a temp file first and are
/// renamed into place, so a crash mid-write leaves the previous checkpoint
/// intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Delete the checkpoint for `key`, if any.
    pub fn clear(&self, key: &str) -> Result<(), MatchError> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| checkpoint_error(key, &path, e))?;
        }
        Ok(())
    }
}

fn checkpoint_error(key: &str, path: &Path, e: impl std::fmt::Display) -> MatchError {
    MatchError::Checkpoint {
        key: key.to_string(),
        message: format!("{}: {e}", path.display()),
    }
}

impl CheckpointStore for JsonFileStore {
    fn save(&self, key: &str, batch: &RecordBatch) -> Result<(), MatchError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| checkpoint_error(key, &self.dir, e))?;

        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_vec(batch).map_err(|e| checkpoint_error(key, &path, e))?;
        std::fs::write(&tmp_path, json).map_err(|e| checkpoint_error(key, &tmp_path, e))?;
        std::fs::rename(&tmp_path, &path).map_err(|e| checkpoint_error(key, &path, e))?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<RecordBatch>, MatchError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path).map_err(|e| checkpoint_error(key, &path, e))?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| checkpoint_error(key, &path, e))
    }
}
