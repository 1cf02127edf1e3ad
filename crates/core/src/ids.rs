// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes for the Lance domain model.

crate::define_id! {
    /// Stable sync-daemon device identifier. Immutable for the device's lifetime.
    pub struct DeviceId;
}

crate::define_id! {
    /// Stable sync-daemon folder identifier.
    pub struct FolderId;
}

crate::define_id! {
    /// Identifier of a shot within a project's shot map.
    pub struct ShotId;
}

crate::define_id! {
    /// Identifier of a shot-part within `(project, shot)`.
    pub struct ShotPartId;
}

crate::define_id! {
    /// Identifier of a user within a project's configuration document.
    pub struct UserId;
}

crate::define_id! {
    /// Project name, as used to name its `server.configuration` folder.
    pub struct ProjectName;
}
