//! `lance device` behavior when no daemon is running.

use crate::prelude::*;

#[test]
fn device_list_fails_without_daemon() {
    let state = IsolatedState::new();
    state.lance().args(&["device", "list"]).fails().stderr_has("daemon not running");
}

#[test]
fn device_remove_fails_without_daemon() {
    let state = IsolatedState::new();
    state
        .lance()
        .args(&["device", "remove", "AAAA-BBBB"])
        .fails();
}
