use crate::config::Thresholds;
use crate::model::{CatalogProduct, MatchOutcome, OperationRecord};
use crate::similarity::similarity;

/// Similarities of one record against one catalog product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldScores {
    pub name: f64,
    pub dose: f64,
    pub manufacturer: f64,
    /// Similarity of the concatenated name + dose + manufacturer strings.
    pub combined: f64,
}

/// How a single catalog product relates to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Exact,
    Candidate,
    Unlikely,
}

impl FieldScores {
    pub fn compute(record: &OperationRecord, product: &CatalogProduct) -> Self {
        Self {
            name: similarity(&record.name, &product.name),
            dose: similarity(&record.dose, &product.dose),
            manufacturer: similarity(&record.manufacturer, &product.manufacturer),
            combined: similarity(&record.product_info(), &product.product_info()),
        }
    }

    /// Agreement on every field beats any blended score, so it is checked
    /// first.
    pub fn verdict(&self, t: &Thresholds) -> Verdict {
        let fields_agree =
            self.name >= t.field && self.dose >= t.field && self.manufacturer >= t.field;
        if fields_agree || self.combined >= t.combined_exact {
            Verdict::Exact
        } else if self.combined >= t.candidate {
            Verdict::Candidate
        } else {
            Verdict::Unlikely
        }
    }
}

/// Classifies records against a read-only catalog. Catalog order matters:
/// the first product that qualifies as an exact match wins.
pub struct Matcher<'a> {
    catalog: &'a [CatalogProduct],
    thresholds: Thresholds,
}

impl<'a> Matcher<'a> {
    pub fn new(catalog: &'a [CatalogProduct], thresholds: Thresholds) -> Self {
        Self { catalog, thresholds }
    }

    pub fn catalog(&self) -> &'a [CatalogProduct] {
        self.catalog
    }

    /// Scan the catalog for `record` and settle it as an exact match, a set
    /// of review candidates, or (empty catalog / nothing above zero)
    /// unresolved. Resolved records are left untouched.
    pub fn classify(&self, record: &mut OperationRecord) -> MatchOutcome {
        if record.resolved {
            return MatchOutcome::AlreadyResolved;
        }

        // A half-written candidate list from an interrupted run is discarded.
        record.candidates.clear();
        record.matched_id = None;

        let mut best: Option<&CatalogProduct> = None;
        let mut best_score = 0.0;

        for product in self.catalog {
            let scores = FieldScores::compute(record, product);
            match scores.verdict(&self.thresholds) {
                Verdict::Exact => {
                    record.candidates.clear();
                    record.matched_id = Some(product.id.clone());
                    record.resolved = true;
                    return MatchOutcome::ExactMatch {
                        id: product.id.clone(),
                    };
                }
                Verdict::Candidate => record.candidates.push(product.clone()),
                Verdict::Unlikely => {
                    if scores.combined > best_score {
                        best = Some(product);
                        best_score = scores.combined;
                    }
                }
            }
        }

        // Every unresolved record gets at least one suggestion when anything
        // in the catalog scored above zero.
        if record.candidates.is_empty() {
            if let Some(product) = best {
                record.candidates.push(product.clone());
            }
        }
        record.resolved = true;

        if record.candidates.is_empty() {
            MatchOutcome::Unresolved
        } else {
            MatchOutcome::CandidateSet {
                count: record.candidates.len(),
            }
        }
    }
}
