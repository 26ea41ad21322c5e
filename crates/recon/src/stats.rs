use serde::Serialize;

use crate::model::{OperationKind, RecordBatch};

/// Match quality of one batch.
///
/// `unlikely` covers every record that neither matched nor collected more
/// than one candidate, i.e. those left with a single fallback suggestion or
/// none at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub kind: OperationKind,
    pub total: usize,
    pub matched: usize,
    pub multiple_candidates: usize,
    pub unlikely: usize,
    /// Records the matcher has not reached yet (interrupted scan).
    pub pending: usize,
}

impl BatchStats {
    pub fn of(batch: &RecordBatch) -> Self {
        let mut stats = Self {
            kind: batch.kind,
            total: batch.records.len(),
            matched: 0,
            multiple_candidates: 0,
            unlikely: 0,
            pending: 0,
        };
        for record in &batch.records {
            if !record.resolved {
                stats.pending += 1;
            } else if record.is_matched() {
                stats.matched += 1;
            } else if record.candidates.len() > 1 {
                stats.multiple_candidates += 1;
            } else {
                stats.unlikely += 1;
            }
        }
        stats
    }

    /// Share of matched records, 0.0 for an empty batch.
    pub fn match_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matched as f64 / self.total as f64
        }
    }
}

impl std::fmt::Display for BatchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} total, {} matched ({:.1}%), {} with multiple candidates, {} unlikely",
            self.kind,
            self.total,
            self.matched,
            self.match_rate() * 100.0,
            self.multiple_candidates,
            self.unlikely
        )?;
        if self.pending > 0 {
            write!(f, ", {} pending", self.pending)?;
        }
        Ok(())
    }
}
