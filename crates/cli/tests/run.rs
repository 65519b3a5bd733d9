use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::PathBuf;

/// Writes `bytes` to a fresh file under the OS temp dir and returns its path.
fn write_wasm(name: &str, bytes: &[u8]) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("wasm-insight-cli-test-{name}-{}.wasm", std::process::id()));
    let mut file = std::fs::File::create(&path).expect("create temp wasm file");
    file.write_all(bytes).expect("write temp wasm file");
    path
}

fn cmd() -> Command {
    Command::cargo_bin("wasm-insight").expect("could not find the wasm-insight binary")
}

#[test]
fn empty_module_succeeds_with_no_flags() {
    let path = write_wasm("empty", &[0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00]);
    cmd().arg(&path).assert().success();
    let _ = std::fs::remove_file(path);
}

#[test]
fn bad_header_fails_with_nonzero_exit() {
    let path = write_wasm("bad-header", &[0xDE, 0xAD, 0xBE, 0xEF]);
    cmd().arg(&path).assert().failure().code(1).stderr(predicate::str::contains("bad magic"));
    let _ = std::fs::remove_file(path);
}

#[test]
fn missing_file_fails() {
    cmd().arg("/nonexistent/path/does-not-exist.wasm").assert().failure().code(1);
}

#[test]
fn empty_module_with_frequency_flag_reports_empty_code_section() {
    let path = write_wasm("empty-freq", &[0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00]);
    cmd()
        .arg(&path)
        .arg("--HighFrequencySubExpr")
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty code section"));
    let _ = std::fs::remove_file(path);
}
