use std::process::Command;

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn soundwatch_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_soundwatch").expect("soundwatch test binary not built")
}

#[test]
fn soundwatch_help_mentions_name() {
    let output = Command::new(soundwatch_bin())
        .arg("--help")
        .output()
        .expect("run soundwatch --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("Soundwatch"));
    assert!(combined.contains("--emit-policy"));
}

#[test]
fn soundwatch_list_input_devices_prints_message() {
    let output = Command::new(soundwatch_bin())
        .arg("--list-input-devices")
        .output()
        .expect("run soundwatch --list-input-devices");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(
        combined.contains("audio input devices")
            || combined.contains("Failed to list audio input devices")
    );
}

#[test]
fn soundwatch_lists_devices_from_test_override() {
    let output = Command::new(soundwatch_bin())
        .arg("--list-input-devices")
        .env("SOUNDWATCH_TEST_DEVICES", "Built-in Mic,USB Audio")
        .output()
        .expect("run soundwatch --list-input-devices");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Available audio input devices:"));
    assert!(stdout.contains("  - USB Audio"));
}

#[test]
fn soundwatch_rejects_out_of_range_frame_capacity() {
    let output = Command::new(soundwatch_bin())
        .args(["--frame-channel-capacity", "0", "--list-input-devices"])
        .output()
        .expect("run soundwatch with bad capacity");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("frame-channel-capacity"));
}

#[test]
fn soundwatch_rejects_unknown_emit_policy() {
    let output = Command::new(soundwatch_bin())
        .args(["--emit-policy", "sometimes"])
        .output()
        .expect("run soundwatch with bad emit policy");
    assert!(!output.status.success());
}
