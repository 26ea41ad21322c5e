// Rejected-row listings

use std::path::{Path, PathBuf};

use skumatch_recon::model::RejectedRow;
use skumatch_recon::rejected::listings;

/// Write one `<source>.txt` per source file under `dir`. Returns the files
/// written; nothing is written when no row was rejected.
pub fn write_listings(dir: &Path, rejected: &[RejectedRow]) -> Result<Vec<PathBuf>, String> {
    let grouped = listings(rejected);
    if grouped.is_empty() {
        return Ok(Vec::new());
    }
    std::fs::create_dir_all(dir).map_err(|e| format!("{}: {e}", dir.display()))?;

    let mut written = Vec::with_capacity(grouped.len());
    for (source, lines) in grouped {
        let path = dir.join(format!("{source}.txt"));
        let mut body = lines.join("\n");
        body.push('\n');
        std::fs::write(&path, body).map_err(|e| format!("{}: {e}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Remove the listings of `sources` left by an earlier run. Sources that
/// still have rejected rows get theirs rewritten by [`write_listings`].
pub fn remove_listings<S: AsRef<str>>(dir: &Path, sources: &[S]) -> Result<(), String> {
    for source in sources {
        let path = dir.join(format!("{}.txt", source.as_ref()));
        match std::fs::remove_file(&path) {
            Ok(()) => log::debug!("removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(format!("{}: {e}", path.display())),
        }
    }
    Ok(())
}
