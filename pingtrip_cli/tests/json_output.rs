use assert_cmd::prelude::*;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::Command;
use std::sync::mpsc;
use std::time::Duration;
use tempfile::tempdir;

fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("pingtrip.toml");
    fs::write(&path, body).unwrap();
    path
}

fn pingtrip_json(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("pingtrip").unwrap();
    cmd.arg("--config")
        .arg(cfg)
        .arg("--json")
        .arg("--log-level")
        .arg("error");
    cmd
}

// stderr mixes JSON log lines with the error object; pick the error.
fn error_object(stderr: &[u8]) -> serde_json::Value {
    String::from_utf8_lossy(stderr)
        .lines()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .find(|v| v.get("reason").is_some())
        .expect("error JSON on stderr")
}

#[test]
fn calibration_failure_json_has_details() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[calibration]\ninter_sample_ms = 1\n");
    let out = pingtrip_json(&cfg)
        .arg("calibrate")
        .env("PINGTRIP_SIM_JITTER_CM", "20")
        .assert()
        .code(3)
        .get_output()
        .clone();
    let v = error_object(&out.stderr);
    assert_eq!(v["reason"], "CalibrationFailed");
    assert_eq!(v["details"]["iterations"], 30);
    assert_eq!(v["details"]["max_variance"], 5);
    assert!(v["details"]["running_variance"].as_i64().unwrap() > 5);
}

#[test]
fn calibrate_json_success() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[calibration]\ninter_sample_ms = 1\n");
    let out = pingtrip_json(&cfg)
        .arg("calibrate")
        .env("PINGTRIP_SIM_SURFACE_CM", "150")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["baseline_cm"], 150);
    assert_eq!(v["established"], true);
}

#[test]
fn run_uploads_to_local_endpoint() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::channel::<String>();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut s) = stream else { continue };
            let mut buf = [0u8; 512];
            let n = s.read(&mut buf).unwrap_or(0);
            let _ = tx.send(String::from_utf8_lossy(&buf[..n]).into_owned());
            let _ = s.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n{}");
        }
    });

    let dir = tempdir().unwrap();
    let cfg = write_config(
        &dir,
        &format!(
            r#"
[calibration]
inter_sample_ms = 1
[detection]
tick_ms = 1
[telemetry]
device_id = "lane-1"
host = "127.0.0.1"
port = {port}
interval_ms = 10
timeout_ms = 1000
"#
        ),
    );
    let out = pingtrip_json(&cfg)
        .args(["run", "--ticks", "40"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["ticks"], 40);
    assert_eq!(v["baseline"], 200);
    assert!(v["uploads_ok"].as_u64().unwrap() >= 1);
    assert_eq!(v["uploads_failed"], 0);

    let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(
        first.starts_with("GET /dweet/for/lane-1?&sonar_count=0&sonar_average=200&sonar_baseline=200 HTTP/1.1\r\n\r\n"),
        "unexpected request: {first:?}"
    );
}

#[test]
fn encode_json_escapes_record() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let out = pingtrip_json(&cfg)
        .args(["encode", "--count", "5", "--average", "198", "--baseline", "200"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(
        v["record"],
        "GET /dweet/for/PingTrip?&sonar_count=5&sonar_average=198&sonar_baseline=200 HTTP/1.1\r\n\r\n"
    );
    assert_eq!(v["len"], 88);
}
