//! CLI help and version output specs.

use crate::prelude::*;

#[test]
fn lance_no_args_shows_usage_and_exits_zero() {
    cli().passes().stdout_has("Usage:");
}

#[test]
fn lance_help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn lance_device_help_shows_subcommands() {
    cli()
        .args(&["device", "--help"])
        .passes()
        .stdout_has("list")
        .stdout_has("add")
        .stdout_has("remove");
}

#[test]
fn lance_folder_help_shows_subcommands() {
    cli()
        .args(&["folder", "--help"])
        .passes()
        .stdout_has("list")
        .stdout_has("add")
        .stdout_has("remove")
        .stdout_has("set-devices");
}

#[test]
fn lance_project_help_shows_subcommands() {
    cli()
        .args(&["project", "--help"])
        .passes()
        .stdout_has("list")
        .stdout_has("add");
}

#[test]
fn lance_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}

#[test]
fn lance_unknown_subcommand_fails() {
    cli().args(&["nonexistent"]).fails();
}
