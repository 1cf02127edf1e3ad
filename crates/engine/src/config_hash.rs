// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregate configuration-hash computation (spec.md §4.3.8, §7). Every
//! client periodically computes this same hash over its own roster and
//! compares it against the server's; a mismatch means "not yet synced" and
//! gates every server-mutating operation (spec.md §4.3.6).

use lance_core::{Device, Folder, FolderId, User};

/// `"{servers}:{devices}:{folders}:{ignored}"`, each term a hex xor-fold of
/// the member entities' own `configuration_hash()`. The "ignored" term
/// covers folders this host has locally declined to sync (spec.md §3
/// `ignored_folders`) — kept as a distinct term so an ignore-list edit
/// doesn't get masked by an unrelated folder change sharing the same xor.
pub fn aggregate_hash(
    servers: &[&str],
    devices: &[Device],
    folders: &[Folder],
    ignored_folders: &[FolderId],
) -> String {
    let servers_xor = xor_fold(servers.iter().map(|s| str_hash(s)));
    let devices_xor = xor_fold(devices.iter().map(|d| d.configuration_hash()));
    let folders_xor = xor_fold(folders.iter().map(|f| f.configuration_hash()));
    let ignored_xor = xor_fold(ignored_folders.iter().map(|id| str_hash(id.as_str())));

    format!(
        "{:016x}:{:016x}:{:016x}:{:016x}",
        servers_xor, devices_xor, folders_xor, ignored_xor
    )
}

/// Users aren't part of the sync-daemon's own configuration, but they are
/// part of what a client must agree with the server on (spec.md §3), so
/// project-level hashing folds them in separately.
pub fn users_hash(users: &[User]) -> String {
    format!("{:016x}", xor_fold(users.iter().map(user_hash)))
}

fn user_hash(user: &User) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    user.id.as_str().hash(&mut hasher);
    user.name.hash(&mut hasher);
    for device in &user.devices {
        device.as_str().hash(&mut hasher);
    }
    hasher.finish()
}

fn str_hash(s: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

fn xor_fold(values: impl Iterator<Item = u64>) -> u64 {
    values.fold(0u64, |acc, v| acc ^ v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lance_core::DeviceId;
    use serde_json::Value;

    #[test]
    fn empty_rosters_hash_deterministically() {
        let h1 = aggregate_hash(&[], &[], &[], &[]);
        let h2 = aggregate_hash(&[], &[], &[], &[]);
        assert_eq!(h1, h2);
        assert_eq!(h1.matches(':').count(), 3);
    }

    #[test]
    fn device_order_does_not_affect_hash() {
        let d1 = Device::new(DeviceId::new("d1"), None, 0);
        let d2 = Device::new(DeviceId::new("d2"), None, 0);
        let h1 = aggregate_hash(&[], &[d1.clone(), d2.clone()], &[], &[]);
        let h2 = aggregate_hash(&[], &[d2, d1], &[], &[]);
        assert_eq!(h1, h2);
    }

    #[test]
    fn adding_a_device_changes_hash() {
        let d1 = Device::new(DeviceId::new("d1"), None, 0);
        let d2 = Device::new(DeviceId::new("d2"), None, 0);
        let before = aggregate_hash(&[], &[d1.clone()], &[], &[]);
        let after = aggregate_hash(&[], &[d1, d2], &[], &[]);
        assert_ne!(before, after);
    }

    #[test]
    fn folder_and_ignored_lists_are_independent_terms() {
        let folder = Folder::new(
            lance_core::FolderId::new("f1"),
            "l",
            None,
            [],
            Value::Null,
        );
        let with_folder = aggregate_hash(&[], &[], &[folder], &[]);
        let with_ignored = aggregate_hash(&[], &[], &[], &[lance_core::FolderId::new("f1")]);
        assert_ne!(with_folder, with_ignored);
    }
}
