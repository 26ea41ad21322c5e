//! Grouping of matched records for export: one group per counterpart and
//! year, records in period order.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::MatchError;
use crate::model::{OperationKind, OperationRecord, Period, RecordBatch};

pub const EXPORT_HEADERS: [&str; 8] = [
    "counterpart",
    "id",
    "name",
    "dose",
    "manufacturer",
    "amount",
    "unit price",
    "total",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub period: Period,
    pub counterpart: String,
    pub id: String,
    pub name: String,
    pub dose: String,
    pub manufacturer: String,
    pub amount: f64,
    pub unit_price: Option<f64>,
    pub total_price: Option<f64>,
}

impl ExportRow {
    fn from_record(record: &OperationRecord, id: &str) -> Self {
        Self {
            period: record.period,
            counterpart: record.counterpart.clone(),
            id: id.to_string(),
            name: record.name.clone(),
            dose: record.dose.clone(),
            manufacturer: record.manufacturer.clone(),
            amount: record.amount,
            unit_price: record.unit_price,
            total_price: record.total_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportGroup {
    pub kind: OperationKind,
    pub counterpart: String,
    pub year: i32,
    pub rows: Vec<ExportRow>,
}

pub trait ExportSink {
    /// Called once before the groups of `kind` are written.
    fn begin(&mut self, _kind: OperationKind) -> Result<(), MatchError> {
        Ok(())
    }

    fn write_group(&mut self, group: &ExportGroup) -> Result<(), MatchError>;
}

impl ExportSink for Vec<ExportGroup> {
    fn write_group(&mut self, group: &ExportGroup) -> Result<(), MatchError> {
        self.push(group.clone());
        Ok(())
    }
}

/// Matched records of `batch`, grouped by (counterpart, year). Groups come
/// out sorted by counterpart then year; rows keep batch order within a
/// period.
pub fn group_matched(batch: &RecordBatch) -> Vec<ExportGroup> {
    let mut groups: BTreeMap<(String, i32), Vec<ExportRow>> = BTreeMap::new();
    for record in &batch.records {
        let Some(id) = record.matched_id.as_deref() else {
            continue;
        };
        groups
            .entry((record.counterpart.clone(), record.period.year))
            .or_default()
            .push(ExportRow::from_record(record, id));
    }

    groups
        .into_iter()
        .map(|((counterpart, year), mut rows)| {
            rows.sort_by_key(|r| r.period);
            ExportGroup {
                kind: batch.kind,
                counterpart,
                year,
                rows,
            }
        })
        .collect()
}

/// Write every group of `batch` into `sink`. Returns the group count.
pub fn export_matched<S: ExportSink + ?Sized>(
    batch: &RecordBatch,
    sink: &mut S,
) -> Result<usize, MatchError> {
    let groups = group_matched(batch);
    sink.begin(batch.kind)?;
    for group in &groups {
        sink.write_group(group)?;
    }
    log::info!(
        "{} export: {} group(s), {} matched record(s)",
        batch.kind,
        groups.len(),
        groups.iter().map(|g| g.rows.len()).sum::<usize>()
    );
    Ok(groups.len())
}
