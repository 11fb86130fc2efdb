//! Integration tests for chamber-cli.
//!
//! Each test runs the built `chamber` binary against files in a temporary
//! directory.

use chamber_io::{BitDepth, read_mono, write_mono};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Helper to get the path to the `chamber` binary built by cargo.
fn chamber_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_chamber"))
}

/// A short click followed by silence, at 48 kHz.
fn write_click(dir: &Path) -> PathBuf {
    let path = dir.join("click.wav");
    let mut samples = vec![0.0f32; 4800];
    samples[0] = 0.5;
    write_mono(&path, &samples, 48000, BitDepth::Float32).unwrap();
    path
}

// ---------------------------------------------------------------------------
// `chamber render`
// ---------------------------------------------------------------------------

#[test]
fn render_appends_tail_and_reports_stats() {
    let dir = TempDir::new().unwrap();
    let input = write_click(dir.path());
    let output = dir.path().join("out.wav");

    let result = chamber_bin()
        .args(["render"])
        .arg(&input)
        .arg(&output)
        .args(["--tail-seconds", "0.5"])
        .output()
        .expect("failed to run chamber render");

    assert!(
        result.status.success(),
        "render failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("Stats:"));
    assert!(stdout.contains("Done!"));

    let clip = read_mono(&output).unwrap();
    let rendered = clip.samples;
    assert_eq!(clip.sample_rate, 48000);
    assert_eq!(rendered.len(), 4800 + 24000);
    assert!(rendered.iter().all(|s| s.is_finite()));
    assert!(
        rendered[4800..].iter().any(|s| s.abs() > 1e-6),
        "tail should carry reverb energy"
    );
}

#[test]
fn render_reads_config_file() {
    let dir = TempDir::new().unwrap();
    let input = write_click(dir.path());
    let output = dir.path().join("out.wav");
    let config = dir.path().join("room.toml");
    std::fs::write(
        &config,
        "[room]\nlength = 12.0\nwidth = 10.0\nheight = 8.0\n\n\
         [material]\nresponse = \"lowpass\"\nfrequency = 3000.0\nshape = 0.707\n\n\
         [reverb]\nenabled = false\ntail_seconds = 0.1\n",
    )
    .unwrap();

    let result = chamber_bin()
        .arg("render")
        .arg(&input)
        .arg(&output)
        .arg("--config")
        .arg(&config)
        .args(["--bit-depth", "16"])
        .output()
        .expect("failed to run chamber render");

    assert!(
        result.status.success(),
        "render failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("lowpass"), "stdout: {stdout}");
    assert!(stdout.contains("early reflections only"), "stdout: {stdout}");

    let clip = read_mono(&output).unwrap();
    assert_eq!(clip.source_bits, 16);
    assert_eq!(clip.samples.len(), 4800 + 4800);
}

#[test]
fn render_rejects_unknown_material() {
    let dir = TempDir::new().unwrap();
    let input = write_click(dir.path());
    let output = dir.path().join("out.wav");

    let result = chamber_bin()
        .arg("render")
        .arg(&input)
        .arg(&output)
        .args(["--material", "allpass"])
        .output()
        .expect("failed to run chamber render");

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("allpass"), "stderr: {stderr}");
    assert!(!output.exists());
}

#[test]
fn render_rejects_bad_bit_depth() {
    let dir = TempDir::new().unwrap();
    let input = write_click(dir.path());
    let output = dir.path().join("out.wav");

    let result = chamber_bin()
        .arg("render")
        .arg(&input)
        .arg(&output)
        .args(["--bit-depth", "12"])
        .output()
        .expect("failed to run chamber render");

    assert!(!result.status.success());
    assert!(!output.exists());
}

#[test]
fn render_missing_input_fails() {
    let dir = TempDir::new().unwrap();

    let result = chamber_bin()
        .arg("render")
        .arg(dir.path().join("missing.wav"))
        .arg(dir.path().join("out.wav"))
        .output()
        .expect("failed to run chamber render");

    assert!(!result.status.success());
}

// ---------------------------------------------------------------------------
// `chamber info`
// ---------------------------------------------------------------------------

#[test]
fn info_prints_cube_room_resonances() {
    let result = chamber_bin()
        .args([
            "info", "--length", "10", "--width", "10", "--height", "10",
        ])
        .output()
        .expect("failed to run chamber info");

    assert!(result.status.success());
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("Axis resonances"));
    assert!(stdout.contains("Reverb window"));
    assert!(stdout.contains("23 rotations"));

    // 10 ft at 48 kHz: round(10 / (1125.33 / 48000)) = 427 samples on every axis.
    let resonance_lines = stdout
        .lines()
        .filter(|line| line.contains("427 samples"))
        .count();
    assert_eq!(resonance_lines, 3, "stdout: {stdout}");
}

#[test]
fn info_without_late_tail() {
    let result = chamber_bin()
        .args(["info", "--no-late", "--sample-rate", "44100"])
        .output()
        .expect("failed to run chamber info");

    assert!(result.status.success());
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("44100 Hz"));
    assert!(stdout.contains("Late tail: disabled"));
}

#[test]
fn gain_flags_conflict() {
    let result = chamber_bin()
        .args(["info", "--gain", "2.0", "--gain-db", "-6"])
        .output()
        .expect("failed to run chamber info");

    assert!(!result.status.success());
}
