use skumatch_recon::checkpoint::{resume_or_build, CheckpointStore, MemoryStore};
use skumatch_recon::config::MatchConfig;
use skumatch_recon::export::{group_matched, ExportGroup};
use skumatch_recon::matcher::Matcher;
use skumatch_recon::model::{OperationKind, Period, RawValue, RecordBatch, SourceRow};
use skumatch_recon::normalize::{load_catalog, Normalizer};
use skumatch_recon::rejected::listings;
use skumatch_recon::report::{ReviewPage, ReviewReporter, ReviewRowKind};
use skumatch_recon::scan::{ScanOptions, Scanner};
use skumatch_recon::stats::BatchStats;

const CONFIG: &str = r#"
name = "Pharmacy 2016"

[catalog]
file = "catalog.xls"

[thresholds]
field = 0.7
combined_exact = 0.8
candidate = 0.5

[scan]
checkpoint_interval = 2
progress_every = 1

[report]
page_size = 2
max_suggestions = 3
"#;

fn text(s: &str) -> RawValue {
    RawValue::Text(s.into())
}

fn catalog_rows() -> Vec<SourceRow> {
    let products = [
        (1001.0, "Aspirin", "500mg", "Acme"),
        (1002.0, "Aspirin", "250mg", "Beta Corp"),
        (1003.0, "Amoxicillin", "0.25g", "North Pharma"),
        (1004.0, "Ibuprofen", "200mg", "Pfizer"),
    ];
    let mut rows: Vec<SourceRow> = products
        .iter()
        .enumerate()
        .map(|(i, (id, name, dose, maker))| {
            SourceRow::new(i + 2)
                .with("系统编码", RawValue::Number(*id))
                .with("品名", text(name))
                .with("规格", text(dose))
                .with("生产企业", text(maker))
        })
        .collect();
    // no id: rejected, load continues
    rows.push(SourceRow::new(6).with("品名", text("Orphan")));
    rows
}

fn incoming_rows() -> Vec<SourceRow> {
    let row = |n: usize, vendor: &str, name: &str, dose: &str, maker: &str, amount: RawValue| {
        SourceRow::new(n)
            .with("供应商", text(vendor))
            .with("品名", text(name))
            .with("规格", text(dose))
            .with("生产企业", text(maker))
            .with("数量", amount)
            .with("购进单价", RawValue::Number(2.0))
    };
    vec![
        row(2, "Kangda", "ASPIRIN", "500mg", "ACME", RawValue::Number(10.0)),
        row(3, "Kangda", "aspirn", "500mg", "acme", RawValue::Number(4.0)),
        row(4, "Hengrui", "amoxicilin", "0.25g", "north pharma", text("8粒")),
        row(5, "Hengrui", "vitamin c", "100mg", "sun", RawValue::Number(1.0)),
        row(6, "42", "aspirin", "500mg", "acme", RawValue::Number(1.0)),
        row(7, "Kangda", "aspirin", "500mg", "acme", text("a few")),
    ]
}

struct Run {
    config: MatchConfig,
    batch: RecordBatch,
    store: MemoryStore,
}

fn run_incoming() -> Run {
    let config = MatchConfig::from_toml(CONFIG).unwrap();
    config.validate().unwrap();

    let catalog = load_catalog("catalog.xls", &catalog_rows(), &config.catalog.columns).unwrap();
    assert_eq!(catalog.items.len(), 4);
    assert_eq!(catalog.rejected.len(), 1);
    assert_eq!(catalog.items[0].id, "1001");

    let normalizer = Normalizer::new(&config.normalize);
    let normalized = normalizer.normalize_rows(
        OperationKind::Incoming,
        "2016.3购进.xls",
        Period::new(2016, 3).unwrap(),
        &incoming_rows(),
        &config.columns.incoming,
    );
    assert_eq!(normalized.items.len(), 4);
    assert_eq!(normalized.rejected.len(), 2);

    let store = MemoryStore::new();
    let matcher = Matcher::new(&catalog.items, config.thresholds);
    let mut batch = RecordBatch::new(OperationKind::Incoming, normalized.items);
    let mut progress = Vec::new();
    Scanner::new(&matcher, &store, ScanOptions::from(&config.scan))
        .scan("incoming", &mut batch, |p| progress.push(p.processed))
        .unwrap();
    assert_eq!(progress, vec![0, 1, 2, 3, 4]);

    Run {
        config,
        batch,
        store,
    }
}

#[test]
fn pipeline_matches_and_suggests() {
    let Run { batch, .. } = run_incoming();
    let ids: Vec<Option<&str>> = batch
        .records
        .iter()
        .map(|r| r.matched_id.as_deref())
        .collect();
    // exact, typo still close enough, corrected amount + typo, no match
    assert_eq!(ids, vec![Some("1001"), Some("1001"), Some("1003"), None]);
    assert_eq!(batch.records[2].amount, 100.0);
    assert!(batch.records.iter().all(|r| r.resolved));

    let unmatched = &batch.records[3];
    assert!(!unmatched.candidates.is_empty());
}

#[test]
fn checkpoint_holds_final_batch() {
    let Run { batch, store, .. } = run_incoming();
    // two interval saves (after 2, after 4 is the end) plus the final one
    assert_eq!(store.save_count(), 2);
    assert_eq!(store.load("incoming").unwrap(), Some(batch.clone()));

    let (resumed, was_resumed) =
        resume_or_build(&store, "incoming", || panic!("checkpoint exists")).unwrap();
    assert!(was_resumed);
    assert_eq!(resumed, batch);
}

#[test]
fn review_and_stats_agree() {
    let Run { config, batch, .. } = run_incoming();

    let stats = BatchStats::of(&batch);
    assert_eq!(stats.total, 4);
    assert_eq!(stats.matched, 3);
    assert_eq!(stats.multiple_candidates + stats.unlikely, 1);

    let mut pages: Vec<ReviewPage> = Vec::new();
    let written = ReviewReporter::from_config(&config.report)
        .write(&batch, &mut pages)
        .unwrap();
    assert_eq!(written, 1);
    let rows = &pages[0].rows;
    assert_eq!(rows[0].kind, ReviewRowKind::Unmatched);
    assert_eq!(rows[0].name, "vitamin c");
    assert_eq!(rows[0].date, "2016.03");
    assert!(rows.len() <= 1 + config.report.max_suggestions);
    assert!(rows[1..].iter().all(|r| r.kind == ReviewRowKind::Suggestion));
}

#[test]
fn export_groups_matched_records() {
    let Run { batch, .. } = run_incoming();
    let groups: Vec<ExportGroup> = group_matched(&batch);
    let keys: Vec<(&str, usize)> = groups
        .iter()
        .map(|g| (g.counterpart.as_str(), g.rows.len()))
        .collect();
    assert_eq!(keys, vec![("Hengrui", 1), ("Kangda", 2)]);
    assert!(groups.iter().all(|g| g.year == 2016));
    assert_eq!(groups[1].rows[0].total_price, Some(20.0));
}

#[test]
fn rejected_rows_are_listed_per_source() {
    let config = MatchConfig::from_toml(CONFIG).unwrap();
    let normalized = Normalizer::new(&config.normalize).normalize_rows(
        OperationKind::Incoming,
        "2016.3购进.xls",
        Period::new(2016, 3).unwrap(),
        &incoming_rows(),
        &config.columns.incoming,
    );
    let listing = listings(&normalized.rejected);
    let lines = &listing["2016.3购进.xls"];
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("row 6: {供应商: sentinel value '42'"));
    assert_eq!(lines[1], "row 7: {数量: cannot coerce 'a few' to a number}");
}
