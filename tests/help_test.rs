use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn help_shows_core_commands_only() {
    let mut cmd = cargo_bin_cmd!("ncsync");
    cmd.arg("--help");
    let output = cmd.assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8_lossy(&output);

    for name in ["bases", "compare", "apply", "export", "init", "config"] {
        assert!(stdout.contains(name), "missing core command: {}", name);
    }
    assert!(
        !stdout.contains("completions"),
        "advanced command leaked: completions"
    );
}

#[test]
fn help_all_shows_advanced_commands() {
    let mut cmd = cargo_bin_cmd!("ncsync");
    cmd.args(["help", "--all"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn help_for_a_command_accepts_aliases() {
    let mut cmd = cargo_bin_cmd!("ncsync");
    cmd.args(["help", "diff"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--include-delete-ops"));
}

#[test]
fn help_for_unknown_command_fails() {
    let mut cmd = cargo_bin_cmd!("ncsync");
    cmd.args(["help", "frobnicate"]);
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown command: frobnicate"));
}

#[test]
fn completions_generate_for_bash() {
    let mut cmd = cargo_bin_cmd!("ncsync");
    cmd.args(["completions", "--shell", "bash"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("ncsync"));
}
