use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_aitalk_cli"))
}

fn report(args: &[&str]) -> Value {
    let output = cli().args(args).output().expect("failed to run aitalk_cli");
    assert!(
        output.status.success(),
        "CLI exited with {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    serde_json::from_str(stdout.trim()).expect("report JSON payload")
}

#[test]
fn kana_report_echoes_input() {
    let json = report(&["--notify", "2", "kana", "--text", "hello"]);

    assert_eq!(json["command"], "kana");
    assert_eq!(json["kana"], "hello");
    assert_eq!(json["output_len"], 5);
    assert_eq!(json["sample_rate"], 44100);
    assert!(json["telemetry"]["total_events"].as_u64().unwrap_or_default() >= 3);
}

#[test]
fn convert_writes_wav() {
    let wav = std::env::temp_dir().join(format!("aitalk_cli_{}.wav", std::process::id()));
    let json = report(&[
        "--voice",
        "kiritan_22",
        "--inline",
        "convert",
        "--text",
        "abcd",
        "--wav",
        wav.to_str().expect("temp path UTF-8"),
    ]);

    assert_eq!(json["command"], "convert");
    assert_eq!(json["sample_rate"], 22050);
    assert_eq!(json["output_len"], 4);

    let reader = hound::WavReader::open(&wav).expect("wav written");
    assert_eq!(reader.spec().sample_rate, 22050);
    assert_eq!(reader.len(), 4);
    let _ = std::fs::remove_file(&wav);
}

#[test]
fn unknown_voice_version_fails() {
    let output = cli()
        .args(["--voice", "yukari", "kana", "--text", "x"])
        .output()
        .expect("failed to run aitalk_cli");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("infer library version"), "stderr: {}", stderr);
}
