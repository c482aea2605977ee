use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const PEOPLE: &str = "name,age\nAlice,30\nBob,\nAlice,30\n";

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_data-sweeper"))
        .args(args)
        .current_dir(dir)
        .env_remove("DATA_SWEEPER_OUTPUT_DIR")
        .env_remove("DATA_SWEEPER_FORMAT")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn convert_in_place_keeps_the_input() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("people.csv"), PEOPLE).unwrap();

    let output = run(
        dir.path(),
        &["people.csv", "--clean", "--remove-duplicates", "--fill-missing", "--columns", "age", "--convert"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(fs::read_to_string(dir.path().join("people.csv")).unwrap(), PEOPLE);
    assert_eq!(fs::read_to_string(dir.path().join("people (1).csv")).unwrap(), "age\n30\n30\n");
    assert!(String::from_utf8_lossy(&output.stdout).contains("people (1).csv"));
}

#[test]
fn existing_chart_is_not_replaced() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("people.csv"), PEOPLE).unwrap();
    fs::write(dir.path().join("people.chart.svg"), "keep").unwrap();

    let output = run(dir.path(), &["people.csv", "--chart"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(fs::read_to_string(dir.path().join("people.chart.svg")).unwrap(), "keep");
    let svg = fs::read_to_string(dir.path().join("people.chart (1).svg")).unwrap();
    assert!(svg.contains("<svg"));
}

#[test]
fn output_dir_is_created() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("people.csv"), PEOPLE).unwrap();

    let output = run(dir.path(), &["people.csv", "--convert", "--format", "excel", "-o", "out"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.path().join("out/people.xlsx").is_file());
}

#[test]
fn failed_files_set_the_exit_status() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("people.csv"), PEOPLE).unwrap();
    fs::write(dir.path().join("notes.txt"), "a,b\n1,2\n").unwrap();

    let output = run(dir.path(), &["notes.txt"]);
    assert!(!output.status.success());

    let output = run(dir.path(), &["people.csv", "notes.txt", "missing.csv"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("== people.csv =="));
    assert!(String::from_utf8_lossy(&output.stderr).contains("2 of 3 files failed"));
}
