//! Global `--output`/`-o` flag parsing specs.
//!
//! Output formatting for successful responses is only reachable against a
//! live daemon, so these specs stick to flag parsing and the shared error
//! path, which both are format-independent.

use crate::prelude::*;

#[test]
fn output_json_flag_is_accepted() {
    let state = IsolatedState::new();
    state
        .lance()
        .args(&["--output", "json", "status"])
        .fails()
        .stderr_has("daemon not running");
}

#[test]
fn output_short_flag_is_accepted() {
    let state = IsolatedState::new();
    state.lance().args(&["-o", "json", "status"]).fails().stderr_has("daemon not running");
}

#[test]
fn output_rejects_unknown_value() {
    cli().args(&["--output", "yaml", "status"]).fails();
}
