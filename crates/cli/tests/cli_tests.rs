// End-to-end tests for the tvlineup binary, driven by saved provider results.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Binary with an isolated settings file.
fn tvlineup(config_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tvlineup"));
    cmd.env("TVLINEUP_CONFIG", config_dir.join("settings.json"));
    cmd.env_remove("TVLINEUP_LOG");
    cmd
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn run_csv(dir: &Path, extra: &[&str]) -> Output {
    let snapshots = fixtures().join("snapshots");
    let aliases = fixtures().join("aliases.csv");
    let output = dir.join("lineup.csv");
    let mut cmd = tvlineup(dir);
    cmd.args(["run", "--format", "csv", "--providers", "directv,dishtv,hulutv"])
        .arg("--snapshots")
        .arg(&snapshots)
        .arg("--aliases")
        .arg(&aliases)
        .arg("--output")
        .arg(&output)
        .args(extra);
    cmd.output().unwrap()
}

#[test]
fn run_writes_unified_csv() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_csv(dir.path(), &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let content = std::fs::read_to_string(dir.path().join("lineup.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines[0],
        "Channel Name,DirecTV Number,DirecTV Entertainment,DirecTV Choice,DishTV,HuluTV"
    );
    assert_eq!(
        &lines[1..],
        &[
            "abc,,,,,✔",
            "espn,206,,✔,,✔",
            "fox news,359,✔,✔,,",
            "usa network,242,✔,✔,,✔",
        ]
    );
}

#[test]
fn run_report_records_failures_and_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("report.json");
    let out = run_csv(dir.path(), &["--report", report_path.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["summary"]["providers_selected"], 3);
    assert_eq!(report["summary"]["providers_collected"], 2);
    assert_eq!(report["summary"]["rows"], 4);
    assert_eq!(report["summary"]["number_conflicts"], 1);
    assert_eq!(report["number_conflicts"][0]["chosen"], "359");
    assert_eq!(report["providers"][1]["provider"], "dishtv");
    assert_eq!(report["providers"][1]["status"], "malformed");
    assert_eq!(report["meta"]["zip_code"], "79423");
}

#[test]
fn per_provider_files() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_csv(dir.path(), &["--per-provider"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let directv = std::fs::read_to_string(dir.path().join("lineup_DirecTV_Channels.csv")).unwrap();
    assert!(directv.starts_with("Channel Name,Number,Entertainment,Choice\n"));
    assert!(directv.contains("FNC,360,✔,✔"));
    assert!(dir.path().join("lineup_HuluTV_Channels.csv").exists());
    // Malformed providers have nothing of their own to show.
    assert!(!dir.path().join("lineup_DishTV_Channels.csv").exists());
}

#[test]
fn xlsx_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out/lineup.xlsx");
    let out = tvlineup(dir.path())
        .args(["run", "--wiki-links", "--per-provider"])
        .arg("--snapshots")
        .arg(fixtures().join("snapshots"))
        .arg("--aliases")
        .arg(fixtures().join("aliases.csv"))
        .arg("--output")
        .arg(&output)
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(output.exists());
    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[test]
fn missing_alias_file_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let out = tvlineup(dir.path())
        .args(["run", "--aliases", "/nonexistent/aliases.csv"])
        .arg("--snapshots")
        .arg(fixtures().join("snapshots"))
        .arg("--output")
        .arg(dir.path().join("lineup.csv"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("--allow-missing-aliases"));
    assert!(!dir.path().join("lineup.csv").exists());
}

#[test]
fn missing_alias_file_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let out = tvlineup(dir.path())
        .args(["run", "--format", "csv", "--providers", "hulutv", "--allow-missing-aliases"])
        .args(["--aliases", "/nonexistent/aliases.csv"])
        .arg("--snapshots")
        .arg(fixtures().join("snapshots"))
        .arg("--output")
        .arg(dir.path().join("lineup.csv"))
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let content = std::fs::read_to_string(dir.path().join("lineup.csv")).unwrap();
    assert!(content.contains("usa hd,✔"));
}

#[test]
fn all_providers_failed_exits_5() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("lineup.csv");
    std::fs::write(&output, "previous\n").unwrap();
    let out = tvlineup(dir.path())
        .args(["run", "--format", "csv", "--providers", "dishtv,slingtv"])
        .arg("--snapshots")
        .arg(fixtures().join("snapshots"))
        .arg("--output")
        .arg(&output)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(5));
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "previous\n");
}

#[test]
fn unwritable_output_exits_4() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("taken");
    std::fs::create_dir(&output).unwrap();
    let out = tvlineup(dir.path())
        .args(["run", "--format", "csv", "--providers", "hulutv"])
        .arg("--snapshots")
        .arg(fixtures().join("snapshots"))
        .arg("--output")
        .arg(&output)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(4), "stderr: {}", stderr(&out));
    assert!(output.is_dir());
}

#[test]
fn usage_errors_exit_2() {
    let dir = tempfile::tempdir().unwrap();
    let out = tvlineup(dir.path()).args(["run", "--providers", "netflix", "--snapshots", "x"]).output().unwrap();
    assert_eq!(out.status.code(), Some(2));

    let out = tvlineup(dir.path()).args(["run"]).output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("--snapshots"));
}

#[test]
fn aliases_lookup_and_check() {
    let dir = tempfile::tempdir().unwrap();
    let aliases = fixtures().join("aliases.csv");
    let out = tvlineup(dir.path())
        .args(["aliases", "lookup"])
        .arg(&aliases)
        .args(["USA HD", "Obscure"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("USA HD\tusa network\n"));
    assert!(text.contains("Obscure\tobscure  (unknown)\n"));

    let out = tvlineup(dir.path()).args(["aliases", "check", "--json"]).arg(&aliases).output().unwrap();
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(report["canonical_names"], 3);
    assert_eq!(report["spellings"], 8);
}

#[test]
fn providers_listing() {
    let dir = tempfile::tempdir().unwrap();
    let out = tvlineup(dir.path()).args(["providers", "--json"]).output().unwrap();
    assert!(out.status.success());
    let list: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 7);
    assert_eq!(list[0]["slug"], "directv");
    assert_eq!(list[0]["channel_numbers"], true);
    assert_eq!(list[6]["name"], "YouTubeTV");
}

#[test]
fn settings_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let out = tvlineup(dir.path()).args(["settings", "set-zip", "90210"]).output().unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let out = tvlineup(dir.path()).args(["settings", "show"]).output().unwrap();
    let shown: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(shown["scrape.zipCode"], "90210");

    let out = tvlineup(dir.path()).args(["settings", "set-zip", "9021"]).output().unwrap();
    assert_eq!(out.status.code(), Some(2));
}
