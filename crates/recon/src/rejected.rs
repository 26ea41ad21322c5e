//! Text listing of rows excluded during normalization, one listing per
//! source file.

use std::collections::BTreeMap;

use crate::error::RecordError;
use crate::model::RejectedRow;

/// `row N: {label: reason, ...}`
pub fn listing_line(rejected: &RejectedRow) -> String {
    let fields = match &rejected.error {
        RecordError::Validation(errors) => errors
            .iter()
            .map(|(label, reason)| format!("{label}: {reason}"))
            .collect::<Vec<_>>()
            .join(", "),
        RecordError::Normalization { field, value } => {
            format!("{field}: cannot coerce '{value}' to a number")
        }
    };
    format!("row {}: {{{fields}}}", rejected.row)
}

/// Group rejected rows by source file, keeping row order within a source.
pub fn listings(rejected: &[RejectedRow]) -> BTreeMap<&str, Vec<String>> {
    let mut out: BTreeMap<&str, Vec<&RejectedRow>> = BTreeMap::new();
    for r in rejected {
        out.entry(r.source.as_str()).or_default().push(r);
    }
    out.into_iter()
        .map(|(source, mut rows)| {
            rows.sort_by_key(|r| r.row);
            (source, rows.into_iter().map(listing_line).collect())
        })
        .collect()
}
