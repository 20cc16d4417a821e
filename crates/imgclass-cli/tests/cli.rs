use std::path::{Path, PathBuf};

use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use tempfile::TempDir;

fn imgclass() -> Command {
    Command::cargo_bin("imgclass").unwrap()
}

fn write_tiff(dir: &Path, name: &str, value: u8) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(2, 2, Rgb([value, value, value]))
        .save_with_format(&path, image::ImageFormat::Tiff)
        .unwrap();
    path
}

fn static_config(dir: &Path, scores: &[f32]) -> PathBuf {
    let path = dir.join("config.json");
    let config = serde_json::json!({
        "model": {
            "class_count": scores.len(),
            "backend": { "kind": "static", "scores": scores }
        }
    });
    std::fs::write(&path, config.to_string()).unwrap();
    path
}

struct Workspace {
    _root: TempDir,
    input: PathBuf,
    report: PathBuf,
    config: PathBuf,
}

fn workspace(scores: &[f32]) -> Workspace {
    let root = tempfile::tempdir().unwrap();
    let input = root.path().join("images");
    std::fs::create_dir(&input).unwrap();
    let report = root.path().join("report.txt");
    let config = static_config(root.path(), scores);
    Workspace {
        _root: root,
        input,
        report,
        config,
    }
}

#[test]
fn missing_arguments_exit_with_one() {
    imgclass()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));

    imgclass()
        .arg("only-input")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("<OUTPUT_FILE>"));
}

#[test]
fn help_exits_with_zero() {
    imgclass().arg("--help").assert().success();
}

#[test]
fn classifies_single_white_image() {
    let ws = workspace(&[0.1, 0.9, 0.2]);
    let image = write_tiff(&ws.input, "white.tiff", 255);

    imgclass()
        .arg(&ws.input)
        .arg(&ws.report)
        .arg("--config")
        .arg(&ws.config)
        .assert()
        .success();

    let report = std::fs::read_to_string(&ws.report).unwrap();
    assert_eq!(
        report,
        format!(
            "File: {}\nPredicted class: 1\nClass probabilities: 0.1 0.9 0.2\n\n",
            image.display()
        )
    );
}

#[test]
fn corrupt_file_aborts_before_any_record() {
    let ws = workspace(&[0.5, 0.4]);
    std::fs::write(ws.input.join("a_corrupt.tiff"), b"not an image").unwrap();
    write_tiff(&ws.input, "b_valid.tiff", 10);

    imgclass()
        .arg(&ws.input)
        .arg(&ws.report)
        .arg("-c")
        .arg(&ws.config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("a_corrupt.tiff"));

    assert_eq!(std::fs::read_to_string(&ws.report).unwrap(), "");
}

#[test]
fn continue_on_error_keeps_going() {
    let ws = workspace(&[0.5, 0.4]);
    std::fs::write(ws.input.join("a_corrupt.tiff"), b"not an image").unwrap();
    let valid = write_tiff(&ws.input, "b_valid.tiff", 10);
    let summary = ws.input.parent().unwrap().join("summary.csv");

    imgclass()
        .arg(&ws.input)
        .arg(&ws.report)
        .arg("-c")
        .arg(&ws.config)
        .arg("--continue-on-error")
        .arg("--summary")
        .arg(&summary)
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed files:"));

    let report = std::fs::read_to_string(&ws.report).unwrap();
    assert!(report.contains("Error: "));
    assert!(report.ends_with(&format!(
        "File: {}\nPredicted class: 0\nClass probabilities: 0.5 0.4\n\n",
        valid.display()
    )));

    let csv = std::fs::read_to_string(&summary).unwrap();
    assert!(csv.starts_with("filename,status,predicted_class,processing_time_ms,error\n"));
    assert_eq!(csv.lines().count(), 3);
}

#[test]
fn other_extensions_are_ignored() {
    let ws = workspace(&[1.0]);
    RgbImage::new(2, 2).save(ws.input.join("image.png")).unwrap();
    write_tiff(&ws.input, "upper.TIFF", 0);

    imgclass()
        .arg(&ws.input)
        .arg(&ws.report)
        .arg("-c")
        .arg(&ws.config)
        .assert()
        .success();
    assert_eq!(std::fs::read_to_string(&ws.report).unwrap(), "");

    imgclass()
        .arg(&ws.input)
        .arg(&ws.report)
        .arg("-c")
        .arg(&ws.config)
        .arg("--ignore-case")
        .assert()
        .success();
    let report = std::fs::read_to_string(&ws.report).unwrap();
    assert!(report.contains("upper.TIFF"));
    assert!(!report.contains("image.png"));
}

#[test]
fn repeated_runs_are_identical() {
    let root = tempfile::tempdir().unwrap();
    let input = root.path().join("images");
    std::fs::create_dir(&input).unwrap();
    write_tiff(&input, "a.tif", 0);
    write_tiff(&input, "b.tiff", 90);
    write_tiff(&input, "c.tif", 255);

    let config = root.path().join("random.json");
    std::fs::write(
        &config,
        r#"{ "model": { "backend": { "kind": "random", "seed": 5 } } }"#,
    )
    .unwrap();

    let mut reports = Vec::new();
    for name in ["first.txt", "second.txt"] {
        let report = root.path().join(name);
        imgclass()
            .arg(&input)
            .arg(&report)
            .arg("-c")
            .arg(&config)
            .assert()
            .success();
        reports.push(std::fs::read(&report).unwrap());
    }

    assert_eq!(reports[0], reports[1]);
    assert_eq!(String::from_utf8_lossy(&reports[0]).matches("File: ").count(), 3);
}

#[test]
fn invalid_config_is_rejected() {
    let ws = workspace(&[0.1, 0.9]);

    imgclass()
        .arg(&ws.input)
        .arg(&ws.report)
        .arg("-c")
        .arg(&ws.config)
        .arg("--class-count")
        .arg("3")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("configuration error"));
}

#[test]
fn missing_input_folder_fails() {
    let ws = workspace(&[1.0]);

    imgclass()
        .arg(ws.input.join("absent"))
        .arg(&ws.report)
        .arg("-c")
        .arg(&ws.config)
        .assert()
        .code(1);
}

#[test]
fn host_only_device_is_rejected_when_accelerator_required() {
    let ws = workspace(&[0.1, 0.9]);
    write_tiff(&ws.input, "white.tiff", 255);

    imgclass()
        .arg(&ws.input)
        .arg(&ws.report)
        .arg("-c")
        .arg(&ws.config)
        .arg("--require-accelerator")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("device unavailable"));

    assert!(!ws.report.exists());
}

#[test]
fn rust_log_raises_verbosity() {
    let ws = workspace(&[1.0]);
    write_tiff(&ws.input, "white.tiff", 255);

    imgclass()
        .arg(&ws.input)
        .arg(&ws.report)
        .arg("-c")
        .arg(&ws.config)
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stderr(predicate::str::contains("Compute capability").not());

    imgclass()
        .arg(&ws.input)
        .arg(&ws.report)
        .arg("-c")
        .arg(&ws.config)
        .env("RUST_LOG", "info")
        .assert()
        .success()
        .stderr(predicate::str::contains("Compute capability"));
}
