#![allow(clippy::uninlined_format_args)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

fn srq_binary_path() -> PathBuf {
    match std::env::var("CARGO_BIN_EXE_srq") {
        Ok(value) => PathBuf::from(value),
        Err(_) => {
            let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../target/debug/srq");
            if !path.exists() {
                let status = Command::new("cargo")
                    .args(["build", "-p", "supplier-recon-cli", "--bin", "srq"])
                    .status();
                match status {
                    Ok(value) if value.success() => {}
                    Ok(value) => panic!("failed to build srq binary (status={value})"),
                    Err(err) => panic!("failed to invoke cargo build: {err}"),
                }
            }
            path
        }
    }
}

fn srq_output(data_dir: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(srq_binary_path());
    command.arg("--data-dir").arg(data_dir);
    for arg in args {
        command.arg(arg);
    }

    match command.output() {
        Ok(output) => output,
        Err(err) => panic!("failed to run srq command {:?}: {err}", args),
    }
}

fn stdout_json(output: &Output) -> Value {
    match serde_json::from_slice::<Value>(&output.stdout) {
        Ok(value) => value,
        Err(err) => panic!(
            "failed to parse stdout as JSON: {err}\nstdout={}\nstderr={}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        ),
    }
}

fn fixture_dir() -> TempDir {
    match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("failed to create temp dir: {err}"),
    }
}

fn write_extract(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    if let Err(err) = std::fs::write(&path, body) {
        panic!("failed to write extract fixture: {err}");
    }
    path
}

const EXTRACT: &str = r#"[
  {"supplier": "Acme", "acknowledged_at": "2024-01-01", "ready_at": "2024-01-04"},
  {"supplier": "acme ", "acknowledged_at": "2024-01-01", "ready_at": "2024-01-11"},
  {"supplier": "Beta Freight", "acknowledged_at": "2024-02-01", "ready_at": "2024-02-03"},
  {"supplier": "Beta Freight", "acknowledged_at": "bad-date", "ready_at": "2024-02-05"}
]"#;

#[test]
fn help_contract_lists_expected_subcommands() {
    let output = match Command::new(srq_binary_path()).arg("--help").output() {
        Ok(value) => value,
        Err(err) => panic!("failed to run help command: {err}"),
    };

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for required in ["import", "suppliers", "qualify", "view"] {
        assert!(
            stdout.contains(required),
            "expected help output to contain subcommand {required}; output={stdout}"
        );
    }
}

#[test]
fn import_reports_metrics_skips_and_persists_the_snapshot() {
    let dir = fixture_dir();
    let extract = write_extract(dir.path(), "extract.json", EXTRACT);

    let output = srq_output(
        dir.path(),
        &[
            "import",
            "--file",
            &extract.display().to_string(),
            "--json",
        ],
    );
    assert!(
        output.status.success(),
        "import failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report = stdout_json(&output);
    assert_eq!(report["skipped_rows"], Value::from(1));
    let metrics = match report["metrics"].as_array() {
        Some(metrics) => metrics,
        None => panic!("expected metrics array in report"),
    };
    assert_eq!(metrics.len(), 2);
    // Highest order count first; display name carries the last-seen casing.
    assert_eq!(metrics[0]["supplier_name"], Value::from("acme"));
    assert_eq!(metrics[0]["mean_lead_days"], Value::from(6.5));
    assert_eq!(metrics[0]["urgency"], Value::from("medium"));

    let listing = srq_output(dir.path(), &["suppliers", "list", "--json"]);
    assert!(listing.status.success());
    let listed = stdout_json(&listing);
    assert_eq!(listed, report["metrics"]);
}

#[test]
fn qualify_set_then_view_attaches_status_and_defaults_the_rest() {
    let dir = fixture_dir();
    let extract = write_extract(dir.path(), "extract.json", EXTRACT);

    let import = srq_output(
        dir.path(),
        &["import", "--file", &extract.display().to_string()],
    );
    assert!(import.status.success());

    let set = srq_output(
        dir.path(),
        &[
            "qualify",
            "set",
            "--supplier",
            "ACME",
            "--contact",
            "ops@acme.test",
            "--country",
            "FR",
            "--customs-handling",
            "yes",
            "--shipment-tracking",
            "partial",
            "--payment-terms",
            "net30",
            "--status",
            "approved",
        ],
    );
    assert!(
        set.status.success(),
        "qualify set failed: {}",
        String::from_utf8_lossy(&set.stderr)
    );
    let record = stdout_json(&set);
    assert_eq!(record["status"], Value::from("approved"));
    assert_eq!(record["answers"]["customs_handling"], Value::from("yes"));

    let view = srq_output(dir.path(), &["view", "--json"]);
    assert!(view.status.success());
    let rows = match stdout_json(&view).as_array() {
        Some(rows) => rows.clone(),
        None => panic!("expected unified view array"),
    };
    assert_eq!(rows.len(), 2);

    let acme = match rows.iter().find(|row| row["supplier_name"] == "acme") {
        Some(row) => row.clone(),
        None => panic!("expected a unified row for acme"),
    };
    assert_eq!(acme["qualified"], Value::from(true));
    assert_eq!(acme["status"], Value::from("approved"));
    assert_eq!(acme["country"], Value::from("FR"));

    let beta = match rows
        .iter()
        .find(|row| row["supplier_name"] == "Beta Freight")
    {
        Some(row) => row.clone(),
        None => panic!("expected a unified row for Beta Freight"),
    };
    assert_eq!(beta["qualified"], Value::from(false));
    assert_eq!(beta["status"], Value::from("pending"));
    assert_eq!(beta["contact"], Value::from(""));
}

#[test]
fn qualify_show_for_unknown_supplier_fails_with_a_clear_message() {
    let dir = fixture_dir();

    let output = srq_output(dir.path(), &["qualify", "show", "--supplier", "Ghost"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("no qualification recorded"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn malformed_extract_fails_without_touching_the_stores() {
    let dir = fixture_dir();
    let good = write_extract(dir.path(), "good.json", EXTRACT);
    let import = srq_output(
        dir.path(),
        &["import", "--file", &good.display().to_string()],
    );
    assert!(import.status.success());

    let bad = write_extract(dir.path(), "bad.json", "{not json");
    let output = srq_output(dir.path(), &["import", "--file", &bad.display().to_string()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("malformed order extract"),
        "unexpected stderr: {stderr}"
    );

    // The previous snapshot is still the persisted one.
    let listing = srq_output(dir.path(), &["suppliers", "list", "--json"]);
    assert!(listing.status.success());
    let listed = stdout_json(&listing);
    let listed = match listed.as_array() {
        Some(rows) => rows.clone(),
        None => panic!("expected metrics array"),
    };
    assert_eq!(listed.len(), 2);
}
