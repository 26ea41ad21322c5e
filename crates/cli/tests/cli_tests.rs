// End-to-end tests driving the skumatch binary against CSV fixtures.
//
// Run with: cargo test -p skumatch-cli --test cli_tests -- --nocapture

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const CONFIG: &str = r#"
name = "Pharmacy 2016"

[catalog]
file = "catalog.csv"

[sources]
root = "data"

[scan]
checkpoint_interval = 2
"#;

fn skumatch(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_skumatch"))
        .current_dir(dir)
        .env("RUST_LOG", "error")
        .arg("-q")
        .args(args)
        .output()
        .expect("run skumatch")
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn assert_ok(out: &Output) {
    assert!(
        out.status.success(),
        "exit code: {:?}\nstderr: {}",
        out.status,
        stderr(out)
    );
}

fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("skumatch.toml"), CONFIG).unwrap();
    fs::write(
        root.join("catalog.csv"),
        "系统编码,品名,规格,生产企业\n\
         1001,Aspirin,500mg,Acme\n\
         1002,Aspirin,250mg,Beta Corp\n\
         1003,Amoxicillin,0.25g,North Pharma\n",
    )
    .unwrap();

    let data = root.join("data");
    fs::create_dir(&data).unwrap();
    fs::write(
        data.join("2016.3购进.csv"),
        "供应商,品名,规格,生产企业,数量,购进单价\n\
         Kangda,ASPIRIN,500mg,ACME,10,2.5\n\
         Kangda,vitamin c,100mg,sun,1,3\n\
         42,aspirin,500mg,acme,1,1\n\
         Hengrui,amoxicilin,0.25g,north pharma,8粒,4\n",
    )
    .unwrap();
    fs::write(
        data.join("2016.4销售.csv"),
        "商品去向,品名,规格,生产企业,数量,金额\n\
         City Hospital,aspirin,500mg,acme,2,5\n\
         City Hospital,zinc,10mg,other,1,1\n",
    )
    .unwrap();
    fs::write(data.join("readme.txt"), "not a source").unwrap();
    dir
}

// ===========================================================================
// validate
// ===========================================================================

#[test]
fn validate_accepts_good_config() {
    let dir = fixture();
    let out = skumatch(dir.path(), &["validate", "skumatch.toml"]);
    assert_ok(&out);
    assert!(stderr(&out).contains("config ok: Pharmacy 2016"));
}

#[test]
fn validate_rejects_bad_thresholds() {
    let dir = fixture();
    fs::write(
        dir.path().join("bad.toml"),
        "name = \"x\"\n[catalog]\nfile = \"catalog.csv\"\n[thresholds]\ncandidate = 0.9\n",
    )
    .unwrap();
    let out = skumatch(dir.path(), &["validate", "bad.toml"]);
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("thresholds.candidate"));
}

#[test]
fn missing_config_file_is_config_error() {
    let dir = fixture();
    let out = skumatch(dir.path(), &["validate", "nope.toml"]);
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn unknown_subcommand_is_usage_error() {
    let dir = fixture();
    let out = skumatch(dir.path(), &["frobnicate"]);
    assert_eq!(out.status.code(), Some(2));
}

// ===========================================================================
// run
// ===========================================================================

#[test]
fn run_writes_every_artifact() {
    let dir = fixture();
    let root = dir.path();
    let out = skumatch(root, &["run", "skumatch.toml"]);
    assert_ok(&out);

    assert!(root.join(".skumatch/incoming.json").exists());
    assert!(root.join(".skumatch/outgoing.json").exists());
    assert!(root.join("review/incoming_review_1.xlsx").exists());
    assert!(root.join("review/outgoing_review_1.xlsx").exists());
    assert!(root.join("export/incoming/2016/Kangda.xlsx").exists());
    assert!(root.join("export/incoming/2016/Hengrui.xlsx").exists());
    assert!(root.join("export/outgoing/2016/City Hospital.xlsx").exists());

    let listing = fs::read_to_string(root.join("errors/2016.3购进.csv.txt")).unwrap();
    assert_eq!(listing, "row 4: {供应商: sentinel value '42'}\n");

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("incoming: 3 total, 2 matched"), "stdout: {stdout}");
    assert!(stdout.contains("outgoing: 2 total, 1 matched"), "stdout: {stdout}");
}

#[test]
fn rerun_drops_outputs_that_no_longer_apply() {
    let dir = fixture();
    let root = dir.path();
    assert_ok(&skumatch(root, &["run", "skumatch.toml"]));
    assert!(root.join("errors/2016.3购进.csv.txt").exists());
    assert!(root.join("review/outgoing_review_1.xlsx").exists());

    fs::write(
        root.join("data/2016.3购进.csv"),
        "供应商,品名,规格,生产企业,数量,购进单价\n\
         Kangda,ASPIRIN,500mg,ACME,10,2.5\n",
    )
    .unwrap();
    fs::write(
        root.join("data/2016.4销售.csv"),
        "商品去向,品名,规格,生产企业,数量,金额\n\
         Town Clinic,aspirin,500mg,acme,2,5\n",
    )
    .unwrap();
    assert_ok(&skumatch(root, &["run", "skumatch.toml", "--reload"]));

    assert!(!root.join("errors/2016.3购进.csv.txt").exists());
    assert!(!root.join("review/outgoing_review_1.xlsx").exists());
    assert!(!root.join("review/incoming_review_1.xlsx").exists());
    assert!(!root.join("export/incoming/2016/Hengrui.xlsx").exists());
    assert!(!root.join("export/outgoing/2016/City Hospital.xlsx").exists());
    assert!(root.join("export/outgoing/2016/Town Clinic.xlsx").exists());
    assert!(root.join("export/incoming/2016/Kangda.xlsx").exists());
}

#[test]
fn stats_json_is_single_value() {
    let dir = fixture();
    assert_ok(&skumatch(dir.path(), &["match", "skumatch.toml"]));

    let out = skumatch(dir.path(), &["stats", "skumatch.toml", "--json"]);
    assert_ok(&out);
    let val: serde_json::Value = serde_json::from_str(String::from_utf8_lossy(&out.stdout).trim())
        .expect("stdout must be valid JSON");
    let arr = val.as_array().expect("array of batch stats");
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["kind"], "incoming");
    assert_eq!(arr[0]["total"], 3);
    assert_eq!(arr[0]["matched"], 2);
    assert_eq!(arr[0]["unlikely"], 1);
    assert_eq!(arr[1]["kind"], "outgoing");
    assert_eq!(arr[1]["matched"], 1);
}

// ===========================================================================
// checkpoints
// ===========================================================================

#[test]
fn second_match_resumes_from_checkpoint() {
    let dir = fixture();
    assert_ok(&skumatch(dir.path(), &["match", "skumatch.toml", "--kind", "incoming"]));

    let out = skumatch(dir.path(), &["match", "skumatch.toml", "--kind", "incoming"]);
    assert_ok(&out);
    assert!(stderr(&out).contains("(3 already done)"), "stderr: {}", stderr(&out));

    let out = skumatch(dir.path(), &["match", "skumatch.toml", "--kind", "incoming", "--reload"]);
    assert_ok(&out);
    assert!(stderr(&out).contains("(0 already done)"), "stderr: {}", stderr(&out));
}

#[test]
fn report_without_match_is_checkpoint_error() {
    let dir = fixture();
    let out = skumatch(dir.path(), &["report", "skumatch.toml"]);
    assert_eq!(out.status.code(), Some(5));
    assert!(stderr(&out).contains("skumatch match"));
}

#[test]
fn corrupt_checkpoint_is_checkpoint_error() {
    let dir = fixture();
    fs::create_dir(dir.path().join(".skumatch")).unwrap();
    fs::write(dir.path().join(".skumatch/outgoing.json"), "{").unwrap();
    let out = skumatch(dir.path(), &["export", "skumatch.toml", "--kind", "outgoing"]);
    assert_eq!(out.status.code(), Some(5));
}

// ===========================================================================
// catalog
// ===========================================================================

#[test]
fn missing_catalog_is_catalog_error() {
    let dir = fixture();
    fs::remove_file(dir.path().join("catalog.csv")).unwrap();
    let out = skumatch(dir.path(), &["match", "skumatch.toml"]);
    assert_eq!(out.status.code(), Some(4));
}

#[test]
fn catalog_without_usable_rows_is_catalog_error() {
    let dir = fixture();
    fs::write(dir.path().join("catalog.csv"), "系统编码,品名\n,Aspirin\n").unwrap();
    let out = skumatch(dir.path(), &["match", "skumatch.toml"]);
    assert_eq!(out.status.code(), Some(4));
}

#[test]
fn missing_source_root_is_io_error() {
    let dir = fixture();
    fs::remove_dir_all(dir.path().join("data")).unwrap();
    let out = skumatch(dir.path(), &["match", "skumatch.toml"]);
    assert_eq!(out.status.code(), Some(6));
}
