use assert_cmd::Command;
use predicates::prelude::*;

fn smi_lsl() -> Command {
    let mut cmd = Command::cargo_bin("smi-lsl").unwrap();
    cmd.env_remove("IVIEWX_SDK_PATH")
        .env_remove("IVIEWX_HOME")
        .env_remove("SMI_LSL_SINK");
    cmd
}

// =============================================================================
// GENERAL
// =============================================================================

#[test]
fn test_no_args_shows_help() {
    smi_lsl()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    smi_lsl()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("smi-lsl"));
}

#[test]
fn test_help_flag() {
    smi_lsl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Lab Streaming Layer"));
}

// =============================================================================
// CHANNELS SUBCOMMAND
// =============================================================================

#[test]
fn test_channels_table() {
    smi_lsl()
        .arg("channels")
        .assert()
        .success()
        .stdout(predicate::str::contains("SMI_Raw"))
        .stdout(predicate::str::contains("SMI_Event"))
        .stdout(predicate::str::contains("leftGazeX"))
        .stdout(predicate::str::contains("marcotime"));
}

#[test]
fn test_channels_json() {
    let output = smi_lsl().args(["channels", "--json"]).assert().success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let streams = parsed.as_array().unwrap();
    assert_eq!(streams.len(), 2);

    assert_eq!(streams[0]["name"], "SMI_Raw");
    assert_eq!(streams[0]["type"], "Gaze");
    assert_eq!(streams[0]["source_id"], "smiraw500xa15");
    assert_eq!(streams[0]["channels"].as_array().unwrap().len(), 13);

    assert_eq!(streams[1]["name"], "SMI_Event");
    assert_eq!(streams[1]["channel_count"], 7);
    assert_eq!(streams[1]["channels"][0]["label"], "eye");
}

#[test]
fn test_channels_json_to_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("layout.json");

    smi_lsl()
        .args(["channels", "--json", "--output"])
        .arg(&path)
        .assert()
        .success();

    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 2);
}

// =============================================================================
// INFO SUBCOMMAND
// =============================================================================

#[test]
fn test_info_json() {
    let output = smi_lsl()
        .args(["info", "--json", "--sdk-path", "/nonexistent/iViewXAPI.dll"])
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["library_found"], false);
    assert!(parsed["library_path"].is_null());
    assert!(parsed["lsl_support"].is_boolean());
    assert!(parsed["search_paths"].as_array().unwrap().len() > 0);
}

#[test]
fn test_info_finds_explicit_library() {
    let tmp = tempfile::tempdir().unwrap();
    let lib = tmp.path().join("libiViewXAPI.so");
    std::fs::write(&lib, b"").unwrap();

    smi_lsl()
        .arg("info")
        .arg("--sdk-path")
        .arg(&lib)
        .assert()
        .success()
        .stdout(predicate::str::contains("libiViewXAPI.so"));
}

// =============================================================================
// STREAM SUBCOMMAND
// =============================================================================

#[test]
fn test_stream_missing_sdk() {
    smi_lsl()
        .args([
            "stream",
            "--sdk-path",
            "/nonexistent/iViewXAPI.dll",
            "--sink",
            "json",
        ])
        .write_stdin("q\n")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_stream_invalid_port() {
    smi_lsl()
        .args(["stream", "--simulate", "--sink", "json", "--send-port", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ports must be non-zero"));
}

#[test]
fn test_stream_rejects_zero_sim_rate() {
    smi_lsl()
        .args(["stream", "--simulate", "--sim-rate", "0", "--sink", "json"])
        .write_stdin("q\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("sample rate must be positive"));
}

#[test]
fn test_stream_simulated_quit() {
    smi_lsl()
        .args(["stream", "--simulate", "--sink", "json", "--skip-calibration"])
        .write_stdin("q\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("STREAMING STARTED"))
        .stderr(predicate::str::contains("Terminating..."))
        .stderr(predicate::str::contains("Forwarded"));
}

#[test]
fn test_stream_simulated_calibration_to_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("gaze.jsonl");

    smi_lsl()
        .args(["stream", "--simulate", "--sim-rate", "120", "--sink", "json", "--output"])
        .arg(&path)
        .write_stdin("q\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("deviationXLeft"))
        .stderr(predicate::str::contains("STREAMING STARTED"));

    let contents = std::fs::read_to_string(&path).unwrap();
    for line in contents.lines() {
        let record: serde_json::Value = serde_json::from_str(line).unwrap();
        let stream = record["stream"].as_str().unwrap();
        assert!(stream == "SMI_Raw" || stream == "SMI_Event");
    }
}

#[test]
fn test_stream_end_of_input_stops() {
    smi_lsl()
        .args(["stream", "--simulate", "--sink", "json", "--skip-calibration"])
        .write_stdin("")
        .assert()
        .success()
        .stderr(predicate::str::contains("Terminating..."));
}
