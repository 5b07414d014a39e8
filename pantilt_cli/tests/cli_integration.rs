use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Minimal valid config; the port is unused with --sim but must be present.
fn write_config(dir: &tempfile::TempDir, extra: &str) -> PathBuf {
    let toml = format!(
        r#"
[serial]
port = "/dev/ttyACM0"

[frame]
width = 160
height = 120
poll_timeout_ms = 20

[command]
send_interval_ms = 0
{extra}
"#
    );
    let path = dir.path().join("pantilt.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn pantilt(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("pantilt").unwrap();
    cmd.arg("--config").arg(cfg).env_remove("RUST_LOG");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["track", "--sim", "--frames", "3"], 0, "tracked 3 frames", "stdout")]
#[case(&["track", "--sim", "--frames", "3", "--cooperative"], 0, "tracked 3 frames", "stdout")]
#[case(&["self-check"], 0, "config ok", "stdout")]
#[case(&["track", "--frames", "abc"], 2, "invalid value", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let mut cmd = pantilt(&cfg);
    for a in args {
        cmd.arg(a);
    }
    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => assert.stdout(predicate::str::contains(needle)),
        _ => assert.stderr(predicate::str::contains(needle)),
    };
}

#[test]
fn json_track_summary_is_parseable() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let out = pantilt(&cfg)
        .args(["--json", "track", "--sim", "--frames", "4"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let line = String::from_utf8(out.stdout).unwrap();
    let v: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(v["frames"], 4);
    assert!(v["commands_sent"].as_u64().unwrap() >= 1);
    assert!(v["pan_deg"].as_f64().unwrap() < 90.0);
}

#[test]
fn single_axis_config_reports_no_tilt() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[control]\naxes = \"single\"\n");
    pantilt(&cfg)
        .args(["track", "--sim", "--frames", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pan=").and(predicate::str::contains("tilt=").not()));
}

#[rstest]
#[case("[smoothing]\nalpha = 0.0\n", "smoothing.alpha")]
#[case("[control]\nhome_tilt_deg = 270.0\n", "control.home_tilt_deg")]
#[case("[runner]\nmode = \"sideways\"\n", "not valid TOML")]
fn invalid_values_exit_with_config_code(#[case] extra: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, extra);
    pantilt(&cfg)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    pantilt(&missing)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn missing_serial_section_is_a_toml_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[frame]\nwidth = 160\n").unwrap();
    pantilt(&path)
        .args(["--json", "self-check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("\"reason\":\"Config\""));
}

#[cfg(not(feature = "hardware"))]
#[test]
fn serial_without_hardware_feature_is_a_transport_error() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    pantilt(&cfg)
        .args(["track", "--frames", "1"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("serial support not compiled in"));
}

#[test]
fn log_file_is_written_when_configured() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("track.log");
    let extra = format!("[logging]\nfile = {:?}\nlevel = \"debug\"\n", log.display().to_string());
    let cfg = write_config(&dir, &extra);
    pantilt(&cfg)
        .args(["track", "--sim", "--frames", "2"])
        .assert()
        .success();
    let text = fs::read_to_string(&log).unwrap();
    assert!(text.contains("tracking start"));
}
