// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for external I/O: the sync-daemon child process, its REST API,
//! the pause/resume coordinator built on top of it, and optional desktop
//! notifications.

pub mod http;
pub mod notify;
pub mod pause_lock;
pub mod subprocess;
pub mod syncthing_process;

pub use notify::{DesktopNotifyAdapter, NoOpNotifyAdapter, NotifyAdapter};
pub use pause_lock::{PauseGuard, SyncthingPauseLock};
pub use syncthing_process::{SyncthingProcess, SyncthingProcessError};

#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
