// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User model (spec.md §3). Users live inside a project's `config.cfg`,
//! not in the sync-daemon handler's own configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::{DeviceId, ShotId, ShotPartId, UserId};

/// A `(shot, shot-part)` access grant.
pub type Access = (ShotId, ShotPartId);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub devices: BTreeSet<DeviceId>,
    #[serde(default)]
    pub access: BTreeSet<Access>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            devices: BTreeSet::new(),
            access: BTreeSet::new(),
        }
    }

    pub fn has_access(&self, shot_id: &ShotId, shot_part_id: &ShotPartId) -> bool {
        self.access
            .iter()
            .any(|(s, sp)| s == shot_id && sp == shot_part_id)
    }

    pub fn grant(&mut self, shot_id: ShotId, shot_part_id: ShotPartId) {
        self.access.insert((shot_id, shot_part_id));
    }

    pub fn revoke(&mut self, shot_id: &ShotId, shot_part_id: &ShotPartId) {
        self.access
            .retain(|(s, sp)| !(s == shot_id && sp == shot_part_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_and_check_access() {
        let mut u = User::new(UserId::new("al.bob"), "Alice");
        let shot = ShotId::new("shotA");
        let part = ShotPartId::new("main");
        assert!(!u.has_access(&shot, &part));
        u.grant(shot.clone(), part.clone());
        assert!(u.has_access(&shot, &part));
    }

    #[test]
    fn revoke_removes_single_grant() {
        let mut u = User::new(UserId::new("u"), "U");
        u.grant(ShotId::new("a"), ShotPartId::new("main"));
        u.grant(ShotId::new("a"), ShotPartId::new("fx"));
        u.revoke(&ShotId::new("a"), &ShotPartId::new("main"));
        assert!(!u.has_access(&ShotId::new("a"), &ShotPartId::new("main")));
        assert!(u.has_access(&ShotId::new("a"), &ShotPartId::new("fx")));
    }
}
