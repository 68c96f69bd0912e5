// Copyright (c) 2017-2021 Fabian Schuiki

#[macro_use]
extern crate indoc;

use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};
use tempfile::TempDir;

fn livedce_opt(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_livedce-opt"))
        .args(args)
        .output()
        .unwrap()
}

fn write_input(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("input.asm");
    fs::write(&path, contents).unwrap();
    path
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn default_pipeline_removes_dead_code() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        indoc! {"
            func @f (%a, %b) {
            %entry:
                %x = add %a, %b
                %y = mul %x, %x
                ret %x
            }
        "},
    );
    let output = livedce_opt(&[path_str(&input)]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        indoc! {"
            func @f (%a, %b) {
            %entry:
                %x = add %a, %b
                ret %x
            }
        "}
    );
    assert!(String::from_utf8_lossy(&output.stderr).contains("my DCE  for function: f!"));
}

#[test]
fn use_before_definition_survives() {
    let dir = TempDir::new().unwrap();
    let source = indoc! {"
        func @f (%p) {
        %entry:
            store %p, %x
            br %late
        %late:
            %x = const 1
            ret
        }
    "};
    let input = write_input(&dir, source);
    let output = livedce_opt(&[path_str(&input)]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(String::from_utf8_lossy(&output.stdout), source);
}

#[test]
fn explicit_passes_and_output_file() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        indoc! {"
            func @g () {
            %entry:
                %k = const 4
                ret
            }
        "},
    );
    let out = dir.path().join("output.asm");
    let output = livedce_opt(&[
        path_str(&input),
        "-p",
        "verify",
        "live",
        "-o",
        path_str(&out),
    ]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        indoc! {"
            func @g () {
            %entry:
                ret
            }
        "}
    );
}

#[test]
fn list_passes() {
    let output = livedce_opt(&["--list-passes"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("live"));
    assert!(stdout.contains("Iterative Liveness Analysis dead code elimination"));
}

#[test]
fn malformed_input_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "func @f () {\n%entry:\n    %x = neg %a\n}\n");
    let output = livedce_opt(&[path_str(&input)]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error: input is malformed"));

    let output = livedce_opt(&[path_str(&dir.path().join("missing.asm"))]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("Error: cannot read"));
}
