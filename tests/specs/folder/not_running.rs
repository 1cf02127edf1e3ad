//! `lance folder` behavior when no daemon is running.

use crate::prelude::*;

#[test]
fn folder_list_fails_without_daemon() {
    let state = IsolatedState::new();
    state.lance().args(&["folder", "list"]).fails().stderr_has("daemon not running");
}

#[test]
fn folder_remove_requires_folder_id_argument() {
    let state = IsolatedState::new();
    state.lance().args(&["folder", "remove"]).fails();
}

#[test]
fn folder_add_requires_label_argument() {
    let state = IsolatedState::new();
    state.lance().args(&["folder", "add"]).fails();
}
