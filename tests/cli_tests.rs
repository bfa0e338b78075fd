#![cfg(feature = "cli_api")]

use assert_cmd::Command;
use predicates::str::contains as str_contains;
use tempfile::NamedTempFile;

fn run_cli(script: &str) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("cli").expect("cli binary");
    cmd.write_stdin(script.to_string()).assert()
}

#[test]
fn cli_adds_and_shows_tasks() {
    run_cli("add calibration 1 2025-03-10 2025-03-12 Calibracao anual\nshow\nquit\n")
        .success()
        .stdout(str_contains("Added task 1."))
        .stdout(str_contains("Calibracao anual"))
        .stdout(str_contains("Terminal 1"));
}

#[test]
fn cli_reports_row_in_use() {
    run_cli("add calibration 1 2025-03-10 2025-03-12 Calibracao\nrow delete 1\nquit\n")
        .success()
        .stdout(str_contains("row 1 still has scheduled tasks"));
}

#[test]
fn cli_undo_restores_the_previous_state() {
    let assert = run_cli(
        "add calibration 1 2025-03-10 2025-03-12 Temporaria\nundo\nshow\nquit\n",
    )
    .success()
    .stdout(str_contains("Undone."));
    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    let after_undo = output.split("Undone.").last().unwrap_or_default();
    assert!(
        !after_undo.contains("Temporaria"),
        "undone task should not appear:\n{after_undo}"
    );
}

#[test]
fn cli_rejects_dependency_violations() {
    let script = "add calibration 1 2025-03-10 2025-03-12 Base\n\
        add calibration 1 2025-03-13 2025-03-14 Seguinte\n\
        dep 1 2\n\
        move 2 1 2025-03-11\n\
        quit\n";
    run_cli(script)
        .success()
        .stdout(str_contains("ordering constraint of task 1"));
}

#[test]
fn cli_save_and_load_round_trip() {
    let tmp = NamedTempFile::new().expect("create temp file");
    let path = tmp.path().to_string_lossy().replace('\\', "\\\\");
    let script = format!(
        "add calibration 1 2025-03-10 2025-03-12 Persistida\nsave json {path}\nadd calibration 2 2025-03-17 2025-03-18 Temporaria\nload json {path}\nshow\nquit\n"
    );
    let assert = run_cli(&script).success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("Schedule loaded from"));
    let after_reload = output
        .split("Schedule loaded from")
        .last()
        .unwrap_or_default();
    assert!(after_reload.contains("Persistida"));
    assert!(
        !after_reload.contains("Temporaria"),
        "unsaved task should not survive the reload:\n{after_reload}"
    );
}

#[test]
fn cli_warns_about_upcoming_holidays() {
    let script = "holiday add 2025-07-14 2025-07-18 Parada anual\nwarn 2025-07-07\nquit\n";
    run_cli(script)
        .success()
        .stdout(str_contains("Registered holiday 1."))
        .stdout(str_contains("Upcoming: Parada anual"));
}
