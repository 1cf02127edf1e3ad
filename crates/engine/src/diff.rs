// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure device/folder reconciliation: given an old and a new roster, decide
//! which devices/folders were added, removed, or changed (spec.md §4.3.5,
//! §9 "Event fan-out"). No I/O, no clock — the caller supplies `source`.

use std::collections::BTreeMap;

use lance_core::{Device, DeviceId, Event, EventSource, Folder, FolderId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceDiff {
    pub added: Vec<Device>,
    pub removed: Vec<Device>,
    pub changed: Vec<Device>,
}

impl DeviceDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Turn this diff into the events the bus fans out, in the fixed order
    /// removed → added → changed (spec.md §4.3.5: removal observed before
    /// any replacement with the same id is re-added).
    pub fn into_events(self, source: EventSource) -> Vec<Event> {
        let mut events = Vec::new();
        if !self.removed.is_empty() {
            events.push(Event::DevicesRemoved {
                devices: self.removed,
                source: source.clone(),
            });
        }
        if !self.added.is_empty() {
            events.push(Event::DevicesAdded {
                devices: self.added,
                source: source.clone(),
            });
        }
        if !self.changed.is_empty() {
            events.push(Event::DevicesChanged {
                devices: self.changed,
                source,
            });
        }
        events
    }
}

/// Diff two device rosters by id. A device present in both with an
/// unchanged `configuration_hash()` is omitted entirely.
pub fn diff_devices(
    old: &BTreeMap<DeviceId, Device>,
    new: &BTreeMap<DeviceId, Device>,
) -> DeviceDiff {
    let mut diff = DeviceDiff::default();

    for (id, old_device) in old {
        match new.get(id) {
            None => diff.removed.push(old_device.clone()),
            Some(new_device) if new_device.configuration_hash() != old_device.configuration_hash() => {
                diff.changed.push(new_device.clone());
            }
            Some(_) => {}
        }
    }
    for (id, new_device) in new {
        if !old.contains_key(id) {
            diff.added.push(new_device.clone());
        }
    }

    diff
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderDiff {
    pub added: Vec<Folder>,
    pub removed: Vec<Folder>,
    pub configuration_changed: Vec<Folder>,
}

impl FolderDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.configuration_changed.is_empty()
    }

    pub fn into_events(self, source: EventSource) -> Vec<Event> {
        let mut events = Vec::new();
        if !self.removed.is_empty() {
            events.push(Event::FoldersRemoved {
                folders: self.removed,
                source: source.clone(),
            });
        }
        if !self.added.is_empty() {
            events.push(Event::FoldersAdded {
                folders: self.added,
                source: source.clone(),
            });
        }
        if !self.configuration_changed.is_empty() {
            events.push(Event::FoldersConfigurationChanged {
                folders: self.configuration_changed,
                source,
            });
        }
        events
    }
}

pub fn diff_folders(
    old: &BTreeMap<FolderId, Folder>,
    new: &BTreeMap<FolderId, Folder>,
) -> FolderDiff {
    let mut diff = FolderDiff::default();

    for (id, old_folder) in old {
        match new.get(id) {
            None => diff.removed.push(old_folder.clone()),
            Some(new_folder)
                if new_folder.configuration_hash() != old_folder.configuration_hash() =>
            {
                diff.configuration_changed.push(new_folder.clone());
            }
            Some(_) => {}
        }
    }
    for (id, new_folder) in new {
        if !old.contains_key(id) {
            diff.added.push(new_folder.clone());
        }
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn device(id: &str, name: &str) -> Device {
        Device::new(DeviceId::new(id), Some(name.to_string()), 0)
    }

    fn folder(id: &str, label: &str) -> Folder {
        Folder::new(FolderId::new(id), label, None, [], Value::Null)
    }

    #[test]
    fn unchanged_device_is_not_reported() {
        let mut old = BTreeMap::new();
        old.insert(DeviceId::new("d1"), device("d1", "a"));
        let new = old.clone();
        assert!(diff_devices(&old, &new).is_empty());
    }

    #[test]
    fn renamed_device_is_changed_not_added_and_removed() {
        let mut old = BTreeMap::new();
        old.insert(DeviceId::new("d1"), device("d1", "a"));
        let mut new = BTreeMap::new();
        new.insert(DeviceId::new("d1"), device("d1", "b"));

        let diff = diff_devices(&old, &new);
        assert_eq!(diff.changed.len(), 1);
        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn added_and_removed_devices_are_distinguished() {
        let mut old = BTreeMap::new();
        old.insert(DeviceId::new("d1"), device("d1", "a"));
        let mut new = BTreeMap::new();
        new.insert(DeviceId::new("d2"), device("d2", "b"));

        let diff = diff_devices(&old, &new);
        assert_eq!(diff.removed, vec![device("d1", "a")]);
        assert_eq!(diff.added, vec![device("d2", "b")]);
    }

    #[test]
    fn events_order_is_removed_then_added_then_changed() {
        let mut old = BTreeMap::new();
        old.insert(DeviceId::new("gone"), device("gone", "a"));
        old.insert(DeviceId::new("renamed"), device("renamed", "old-name"));
        let mut new = BTreeMap::new();
        new.insert(DeviceId::new("new"), device("new", "b"));
        new.insert(DeviceId::new("renamed"), device("renamed", "new-name"));

        let events = diff_devices(&old, &new).into_events("test".into());
        let kinds: Vec<_> = events.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                lance_core::EventKind::DevicesRemoved,
                lance_core::EventKind::DevicesAdded,
                lance_core::EventKind::DevicesChanged,
            ]
        );
    }

    #[test]
    fn folder_label_change_is_configuration_changed() {
        let mut old = BTreeMap::new();
        old.insert(FolderId::new("f1"), folder("f1", "old label"));
        let mut new = BTreeMap::new();
        new.insert(FolderId::new("f1"), folder("f1", "new label"));

        let diff = diff_folders(&old, &new);
        assert_eq!(diff.configuration_changed.len(), 1);
    }
}
