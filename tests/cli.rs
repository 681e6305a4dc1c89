use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(name: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_micros();
    let dir = std::env::temp_dir().join(format!("hartz-cli-{name}-{now}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn translate(dir: &Path, src: &str, flags: &[&str]) -> (Output, PathBuf) {
    let input = dir.join("in.hz");
    let output = dir.join("out.txt");
    fs::write(&input, src).expect("write source");

    let out = Command::new(env!("CARGO_BIN_EXE_translator"))
        .arg(&input)
        .arg(&output)
        .args(flags)
        .output()
        .expect("run translator");
    (out, output)
}

#[test]
fn assembles_loop() {
    let dir = unique_temp_dir("loop");
    let (out, output) = translate(&dir, "LOOP: ADD $S1, $S2, $D1\nJMP LOOP\n", &["-w"]);

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(fs::read_to_string(output).expect("read output"), "0101010000\n1010110110\n");
    // LOOP is used, so nothing to warn about
    assert!(!String::from_utf8_lossy(&out.stderr).contains("never used"));
}

#[test]
fn warns_unused_symbols() {
    let dir = unique_temp_dir("unused");
    let (out, _) = translate(&dir, ".SIZE 3\nSTART: HALT\n", &["-w"]);

    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("warning: label START is never used"), "{stderr}");
    assert!(stderr.contains("warning: constant SIZE is never used"), "{stderr}");
}

#[test]
fn undefined_symbol_fails_without_output() {
    let dir = unique_temp_dir("undefined");
    let (out, output) = translate(&dir, "HALT\nJMP UNDEFINED\n", &[]);

    assert_eq!(out.status.code(), Some(2));
    assert!(!output.exists());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("2:\n\t'JMP UNDEFINED'"), "{stderr}");
    assert!(stderr.contains("symbol was never defined: UNDEFINED"), "{stderr}");
}

#[test]
fn malformed_line_exit_code() {
    let dir = unique_temp_dir("malformed");
    let (out, _) = translate(&dir, "NOT $X1, $D1\n", &[]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn halt_only() {
    let dir = unique_temp_dir("halt");
    // the source is never read
    let (out, output) = translate(&dir, "this is not assembly", &["-f"]);

    assert!(out.status.success());
    assert_eq!(fs::read_to_string(output).expect("read output"), "1111000000\n");
}

#[test]
fn prints_symbols_and_info() {
    let dir = unique_temp_dir("symbols");
    let (out, _) = translate(&dir, ".SIZE 3\nLOOP: SW $S1, SIZE\nJMP LOOP\n", &["-s", "-i"]);

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Hartz machine"), "{stdout}");
    assert!(stdout.contains("labels:"), "{stdout}");
    assert!(stdout.lines().any(|l| l.starts_with("LOOP") && l.contains("true")), "{stdout}");
    assert!(stdout.lines().any(|l| l.starts_with("SIZE") && l.ends_with("constant")), "{stdout}");
}

#[test]
fn prints_symbols_on_failure() {
    let dir = unique_temp_dir("symbols-fail");
    let (out, output) = translate(&dir, "LOOP: NOP\nJMP MISSING\n", &["-s"]);

    assert_eq!(out.status.code(), Some(2));
    assert!(!output.exists());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.lines().any(|l| l.starts_with("LOOP")), "{stdout}");
}

#[test]
fn bad_arguments_exit_code() {
    let out = Command::new(env!("CARGO_BIN_EXE_translator"))
        .arg("only-one-file.hz")
        .output()
        .expect("run translator");
    assert_eq!(out.status.code(), Some(64));

    let out = Command::new(env!("CARGO_BIN_EXE_translator"))
        .arg("-h")
        .output()
        .expect("run translator");
    assert!(out.status.success());
}

#[test]
fn missing_input_fails() {
    let dir = unique_temp_dir("missing");
    let out = Command::new(env!("CARGO_BIN_EXE_translator"))
        .arg(dir.join("nope.hz"))
        .arg(dir.join("out.txt"))
        .output()
        .expect("run translator");

    assert!(!out.status.success());
    assert!(!dir.join("out.txt").exists());
}
