//! CLI Integration Tests
//!
//! These tests run the `lightplay` binary. Tests that talk to a toy are
//! marked with #[ignore].
//!
//! Run hardware tests:
//! ```text
//! LIGHTPLAY_DEVICE="LightPlay" cargo test --package lightplay-cli --test cli_integration -- --ignored --nocapture
//! ```

use std::process::{Command, Output};

/// Run lightplay with an isolated config and return output
fn run_lightplay(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lightplay"))
        .args(args)
        .env_remove("LIGHTPLAY_DEVICE")
        .env_remove("LIGHTPLAY_CONFIG")
        .output()
        .expect("Failed to run lightplay binary")
}

// =============================================================================
// Help and Version Tests (no hardware required)
// =============================================================================

#[test]
fn test_help_command() {
    let output = run_lightplay(&["--help"]);
    assert!(output.status.success(), "Help should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("LightPlay"), "Help should mention LightPlay");
    for cmd in ["scan", "on", "off", "fade", "fade-off", "demo"] {
        assert!(stdout.contains(cmd), "Help should list {} command", cmd);
    }
}

#[test]
fn test_version_command() {
    let output = run_lightplay(&["--version"]);
    assert!(output.status.success(), "Version should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("lightplay"), "Version should contain lightplay");
}

#[test]
fn test_subcommand_help() {
    for cmd in ["scan", "on", "off", "fade", "fade-off", "demo"] {
        let output = run_lightplay(&[cmd, "--help"]);
        assert!(output.status.success(), "{} --help should succeed", cmd);
        assert!(!output.stdout.is_empty(), "{} --help should produce output", cmd);
    }
}

// =============================================================================
// Argument Errors (no hardware required)
// =============================================================================

#[test]
fn test_unknown_port_fails() {
    let output = run_lightplay(&["on", "9", "red"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown port"), "stderr was: {}", stderr);
}

#[test]
fn test_unknown_color_fails() {
    let output = run_lightplay(&["fade", "all", "teal"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown color"), "stderr was: {}", stderr);
}

#[test]
fn test_missing_config_file_fails() {
    let output = run_lightplay(&["--config", "/nonexistent/lightplay.toml", "scan"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read config"), "stderr was: {}", stderr);
}

// =============================================================================
// Hardware Tests
// =============================================================================

#[test]
#[ignore = "requires BLE hardware"]
fn test_scan_lists_toys() {
    let output = run_lightplay(&["scan", "--scan-secs", "5"]);
    assert!(output.status.success());
}

#[test]
#[ignore = "requires BLE hardware"]
fn test_on_then_off() {
    let on = run_lightplay(&["on", "1", "green"]);
    assert!(on.status.success());
    assert!(String::from_utf8_lossy(&on.stdout).contains("light 1: on (green)"));

    let off = run_lightplay(&["fade-off", "all"]);
    assert!(off.status.success());
}
