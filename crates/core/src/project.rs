// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project and shot grouping (spec.md §3).

use std::collections::BTreeMap;

use crate::ids::{ShotId, ShotPartId};

/// A shot-part's identity plus the folder that backs it, as seen by the
/// project manager (`lance-daemon::project_manager`) — the folder itself
/// lives in `lance-core::folder`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotPart {
    pub shot_id: ShotId,
    pub shot_part_id: ShotPartId,
}

/// Shots grouped by id, each holding its shot-parts (spec.md §3: "Logical
/// grouping of shot-parts sharing `(project, shotid)`").
pub type ShotMap = BTreeMap<ShotId, BTreeMap<ShotPartId, ShotPart>>;

/// Sanitize a project name into the directory-safe form used for
/// `<data_root>/project_<safe_name>_configuration` (spec.md §6).
pub fn safe_project_dirname(project_name: &str) -> String {
    project_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
