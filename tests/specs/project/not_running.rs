//! `lance project` behavior when no daemon is running.

use crate::prelude::*;

#[test]
fn project_list_fails_without_daemon() {
    let state = IsolatedState::new();
    state.lance().args(&["project", "list"]).fails().stderr_has("daemon not running");
}

#[test]
fn project_add_requires_both_arguments() {
    let state = IsolatedState::new();
    state.lance().args(&["project", "add", "shot010"]).fails();
}
