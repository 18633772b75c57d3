#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::Value;

fn punchprobe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_punchprobe"))
        .args(["--log-level", "off", "--format", "json"])
        .args(args)
        .output()
        .expect("punchprobe should run")
}

fn json_stdout(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be one JSON document")
}

fn temp_file(tag: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "punchprobe-{tag}-{}-{}.hex",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::write(&path, contents).expect("temp file should be writable");
    path
}

#[test]
fn simulate_small_levels_pass() {
    let output = punchprobe(&["simulate", "--levels", "16,128", "--seed", "1"]);

    assert_eq!(output.status.code(), Some(0));
    let report = json_stdout(&output);
    assert_eq!(report["passed"], true);
    assert_eq!(report["policy"], "identifier-keyed");
    assert_eq!(report["levels"][0]["bytes_received"], 288);
    assert_eq!(report["levels"][0]["punches_decoded"], 16);
    assert_eq!(report["levels"][1]["punches_decoded"], 128);
    assert_eq!(report["device"]["writes_dropped"], 0);
}

#[test]
fn simulate_default_levels_detect_overflow() {
    let output = punchprobe(&["simulate", "--seed", "2"]);

    assert_eq!(output.status.code(), Some(1));
    let report = json_stdout(&output);
    assert_eq!(report["passed"], false);
    let levels = report["levels"].as_array().expect("levels array");
    assert_eq!(levels.len(), 4);
    assert_eq!(levels[2]["passed"], true);
    assert_eq!(levels[3]["failure"]["kind"], "verification");
    assert!(levels[3]["punches_decoded"].as_u64().unwrap() < 10_250);
    assert!(report["device"]["writes_dropped"].as_u64().unwrap() > 0);
}

#[test]
fn simulate_overflow_stops_escalation() {
    let output = punchprobe(&[
        "simulate",
        "--capacity",
        "100",
        "--stations",
        "1",
        "--policy",
        "positional",
        "--levels",
        "4,16,4",
    ]);

    assert_eq!(output.status.code(), Some(1));
    let report = json_stdout(&output);
    assert_eq!(report["planned_levels"], 3);
    assert_eq!(report["levels"].as_array().unwrap().len(), 2);
    // 100 bytes hold five whole punches.
    assert_eq!(report["levels"][1]["punches_decoded"], 5);
}

#[test]
fn simulate_more_stations_than_channels_is_usage_error() {
    let output = punchprobe(&["simulate", "--stations", "3", "--channels", "2"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn generate_lists_sequential_serials() {
    let output = punchprobe(&["generate", "4", "--seed", "7"]);

    assert!(output.status.success());
    let out = json_stdout(&output);
    assert_eq!(out["count"], 4);
    assert_eq!(out["bytes"], 72);
    let punches = out["punches"].as_array().unwrap();
    for (i, punch) in punches.iter().enumerate() {
        assert_eq!(punch["serial"], i as u64);
        assert_eq!(punch["store_index"], i as u64);
        assert!(punch["hex"].as_str().unwrap().starts_with("02 d3 0d"));
    }
}

#[test]
fn decode_hex_capture() {
    let punch = "02 d3 0d 00 01 00 00 00 07 03 04 b0 80 00 00 07 ab cd";
    let path = temp_file("clean", &format!("{punch}\n{punch}\n"));

    let output = punchprobe(&["decode", "--hex", path.to_str().unwrap()]);

    assert!(output.status.success());
    let out = json_stdout(&output);
    assert_eq!(out["punches"].as_array().unwrap().len(), 2);
    assert_eq!(out["punches"][1]["offset"], 18);
    assert_eq!(out["punches"][0]["station"], 1);
    assert_eq!(out["punches"][0]["serial"], 7);
    assert_eq!(out["error"], Value::Null);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn decode_reports_desync_with_exit_60() {
    let punch = "02 d3 0d 00 01 00 00 00 07 03 04 b0 80 00 00 07 ab cd";
    let broken = "02 00 0d 00 01 00 00 00 08 03 04 b0 80 00 00 08 ab cd";
    let path = temp_file("desync", &format!("{punch} {broken} {punch}"));

    let output = punchprobe(&["decode", "--hex", path.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(60));
    let out = json_stdout(&output);
    assert_eq!(out["punches"].as_array().unwrap().len(), 1);
    assert_eq!(out["error_offset"], 18);
    assert_eq!(out["consumed"], 18);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn version_prints_name() {
    let output = Command::new(env!("CARGO_BIN_EXE_punchprobe"))
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("punchprobe "));
}
