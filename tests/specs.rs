//! Behavioral specifications for the lance CLI.
//!
//! These tests are black-box: they invoke the compiled `lance` binary and
//! verify stdout, stderr, and exit codes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// cli/
#[path = "specs/cli/help.rs"]
mod cli_help;
#[path = "specs/cli/output.rs"]
mod cli_output;

// daemon/
#[path = "specs/daemon/not_running.rs"]
mod daemon_not_running;
#[path = "specs/daemon/help.rs"]
mod daemon_help;

// device/
#[path = "specs/device/not_running.rs"]
mod device_not_running;

// folder/
#[path = "specs/folder/not_running.rs"]
mod folder_not_running;

// project/
#[path = "specs/project/not_running.rs"]
mod project_not_running;
