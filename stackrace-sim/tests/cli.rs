use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "stackrace-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_json_report_covers_default_roster() {
    let exe = env!("CARGO_BIN_EXE_stackrace-sim");
    let output_path = temp_path("json");
    let status = Command::new(exe)
        .args(["--runs", "200", "--seed", "3", "--report", "json", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(&output_path).expect("read output");
    let report: serde_json::Value = serde_json::from_str(&content).expect("valid json");
    assert_eq!(report["runs"], serde_json::json!(200));
    assert_eq!(report["seed"], serde_json::json!(3));
    let results = report["results"].as_array().expect("results array");
    assert_eq!(results.len(), 6);
    let wins: u64 = results.iter().filter_map(|r| r["wins"].as_u64()).sum();
    assert_eq!(wins, 200);
}

#[test]
fn cli_same_seed_is_reproducible_across_modes() {
    let exe = env!("CARGO_BIN_EXE_stackrace-sim");
    let run = |extra: &[&str]| {
        let output = Command::new(exe)
            .args(["--runs", "300", "--seed", "17", "--report", "csv"])
            .args(extra)
            .output()
            .expect("run cli");
        assert!(output.status.success());
        String::from_utf8_lossy(&output.stdout).into_owned()
    };
    let sequential = run(&[]);
    assert_eq!(sequential, run(&[]));
    assert_eq!(sequential, run(&["--parallel"]));
    assert!(sequential.starts_with("key,name,weight,wins,win_rate,expected_value,std_error"));
}

#[test]
fn cli_reads_custom_roster_file() {
    let exe = env!("CARGO_BIN_EXE_stackrace-sim");
    let config_path = temp_path("roster.json");
    std::fs::write(
        &config_path,
        r#"{ "board_length": 12, "runs": 50, "roster": [
            { "key": "left", "name": "Left", "weight": 1.0 },
            { "key": "right", "name": "Right", "weight": 3.0,
              "skills": [{ "kind": "double_move", "probability": 0.5 }] }
        ] }"#,
    )
    .expect("write config");
    let output = Command::new(exe)
        .args(["--report", "markdown", "--config"])
        .arg(&config_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("# Stackrace Simulation Results"));
    assert!(stdout.contains("- **Races**: 50"));
    assert!(stdout.contains("- **Board length**: 12"));
    assert!(stdout.contains("| Left |") && stdout.contains("| Right |"));
}

#[test]
fn cli_rejects_out_of_range_board_length() {
    let exe = env!("CARGO_BIN_EXE_stackrace-sim");
    let output = Command::new(exe)
        .args(["--runs", "10", "--board-length", "1"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("board_length"), "stderr: {stderr}");
}

#[test]
fn cli_list_roster_writes_output() {
    let exe = env!("CARGO_BIN_EXE_stackrace-sim");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-roster", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Configured competitors"));
    assert!(content.contains("shorekeeper"));
}

#[test]
fn cli_console_report_prints_banner() {
    let exe = env!("CARGO_BIN_EXE_stackrace-sim");
    let output = Command::new(exe)
        .args(["--runs", "20"])
        .env("NO_COLOR", "1")
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Stackrace Simulator"));
    assert!(stdout.contains("Races: 20"));
}
