use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn mallama_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mallama"))
}

#[test]
fn test_cli_help() {
    mallama_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat client"))
        .stdout(predicate::str::contains("--model"));
}

#[test]
fn test_cli_version() {
    mallama_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mallama"));
}

#[test]
fn test_config_where() {
    mallama_cmd().args(["config", "where"]).assert().success();
}

#[test]
fn test_invalid_subcommand() {
    mallama_cmd().arg("invalid-command").assert().failure();
}
