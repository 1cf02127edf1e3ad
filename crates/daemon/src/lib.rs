// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lance Daemon library
//!
//! Exposes the admin protocol types for use by `lance-cli` and integration
//! tests. The daemon binary itself (`main.rs`) has its own internal module
//! tree; this library target only carries the wire surface a client needs.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod protocol;

pub use protocol::{
    DeviceInfo, FolderInfo, ProtocolError, Request, Response, StatusInfo, DEFAULT_TIMEOUT,
    MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};
