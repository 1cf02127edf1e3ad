// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lance-core: domain model shared by every other Lance crate.
//!
//! Devices, folders, users, projects, and the sealed [`Event`] type that
//! flows through the event bus all live here, with no knowledge of HTTP,
//! the filesystem, or process management — those are `lance-adapters`,
//! `lance-storage`, and `lance-daemon`'s concern.

pub mod clock;
pub mod device;
pub mod error;
pub mod event;
pub mod folder;
pub mod id;
pub mod ids;
pub mod project;
pub mod time_fmt;
pub mod user;

pub use clock::{Clock, FakeClock, SystemClock};
pub use device::{Device, DeviceVolatileData};
pub use error::{ProjectManagerError, SyncthingError};
pub use event::{Event, EventKind, EventSource};
pub use folder::{
    Folder, FolderVolatileData, ShotPartIdentity, SERVER_CONFIGURATION_TYPE, SHOT_PART_METADATA_KEY,
    SHOT_PART_TYPE,
};
pub use id::{IdGen, SequentialIdGen, ShortId, UuidIdGen};
pub use ids::{DeviceId, FolderId, ProjectName, ShotId, ShotPartId, UserId};
pub use project::{safe_project_dirname, ShotMap, ShotPart};
pub use time_fmt::{format_elapsed, format_elapsed_ms};
pub use user::{Access, User};
