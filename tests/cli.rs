extern crate assert_cmd;
extern crate predicates;
extern crate tempfile;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn renders_a_small_view() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("view.ppm");
    Command::cargo_bin("mz")
        .unwrap()
        .args(&["--size", "64x36", "--tile-side", "8", "--threads", "2"])
        .args(&["--iterations", "100", "-o"])
        .arg(&out)
        .assert()
        .success();

    let bytes = fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"P6"));
    // Header, then 64 * 36 RGB triples.
    assert!(bytes.len() > 64 * 36 * 3);
    let pixels = &bytes[bytes.len() - 64 * 36 * 3..];
    assert!(pixels.iter().any(|&b| b != 0));
}

#[test]
fn pans_and_zooms_before_the_last_frame() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("zoomed.ppm");
    Command::cargo_bin("mz")
        .unwrap()
        .args(&["--size", "48x27", "--tile-side", "4", "--threads", "3"])
        .args(&["--center", "-0.75,0.1", "--extent", "0.5,0.28125"])
        .args(&["--frames", "20", "--zoom", "in", "--pointer", "0.5,-0.5"])
        .args(&["--iterations", "200", "--no-prefetch", "-o"])
        .arg(&out)
        .assert()
        .success();
    assert!(out.exists());
}

#[test]
fn rejects_an_empty_extent() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("never.ppm");
    Command::cargo_bin("mz")
        .unwrap()
        .args(&["--extent", "0,1", "-o"])
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid viewport"));
    assert!(!out.exists());
}

#[test]
fn rejects_a_malformed_size() {
    Command::cargo_bin("mz")
        .unwrap()
        .args(&["--size", "wide", "-o", "unused.ppm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not parse output image size"));
}

#[test]
fn requires_an_output() {
    Command::cargo_bin("mz")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--output"));
}
