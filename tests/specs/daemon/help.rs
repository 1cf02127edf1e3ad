//! `lance daemon` help output specs.

use crate::prelude::*;

#[test]
fn daemon_help_shows_subcommands() {
    cli()
        .args(&["daemon", "--help"])
        .passes()
        .stdout_has("start")
        .stdout_has("stop")
        .stdout_has("status")
        .stdout_has("restart")
        .stdout_has("logs");
}

#[test]
fn daemon_no_subcommand_defaults_to_status() {
    let state = IsolatedState::new();
    // With no subcommand, `lance daemon` reports status, same as `lance
    // daemon status`. Unlike the top-level `lance status` shorthand, "not
    // running" is a reportable state here, not an error.
    state.lance().args(&["daemon"]).passes().stdout_has("daemon not running");
}
