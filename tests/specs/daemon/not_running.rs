//! `lance daemon` behavior when no daemon is running.

use crate::prelude::*;

#[test]
fn daemon_status_reports_not_running() {
    let state = IsolatedState::new();
    state.lance().args(&["daemon", "status"]).passes().stdout_has("daemon not running");
}

#[test]
fn daemon_status_json_reports_not_running() {
    let state = IsolatedState::new();
    state
        .lance()
        .args(&["--output", "json", "daemon", "status"])
        .passes()
        .stdout_has(r#""status": "not_running""#);
}

#[test]
fn daemon_stop_on_idle_state_is_a_no_op() {
    let state = IsolatedState::new();
    state.lance().args(&["daemon", "stop"]).passes().stdout_has("daemon not running");
}

#[test]
fn daemon_logs_with_no_log_file_reports_none() {
    let state = IsolatedState::new();
    state.lance().args(&["daemon", "logs"]).passes().stdout_has("no log file found");
}
