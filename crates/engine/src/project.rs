// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure project-manager logic (spec.md §4.4): classifying a server's
//! folder roster into projects/shots/shot-parts, and deriving which
//! devices should hold a shot-part folder from the users granted access to
//! it. No I/O — `lance-daemon::project_manager` drives this off bus events
//! and pushes the result back through the sync-daemon handler.

use std::collections::{BTreeMap, BTreeSet};

use lance_core::{DeviceId, Folder, ProjectName, ShotId, ShotMap, ShotPart, ShotPartId, User};

/// One project's view of the folder roster, rebuilt from scratch on every
/// `FoldersConfigurationChanged`/`FoldersAdded`/`FoldersRemoved` event
/// rather than incrementally patched (spec.md §9: rebuild over patch).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectView {
    pub server_configuration_folder: Option<lance_core::FolderId>,
    pub shots: ShotMap,
    pub shot_part_folders: BTreeMap<(ShotId, ShotPartId), lance_core::FolderId>,
}

/// Classify every folder in `folders` by the project its metadata names
/// (spec.md §3). Folders with no `__ProjectManager_data__` metadata are
/// not part of any project and are omitted.
pub fn classify_folders(folders: &[Folder]) -> BTreeMap<ProjectName, ProjectView> {
    let mut projects: BTreeMap<ProjectName, ProjectView> = BTreeMap::new();

    for folder in folders {
        if folder.is_server_configuration() {
            if let Some(project) = server_configuration_project(folder) {
                projects.entry(project).or_default().server_configuration_folder =
                    Some(folder.id.clone());
            }
            continue;
        }

        let Some(identity) = folder.shot_part_identity() else {
            continue;
        };
        let project = ProjectName::new(identity.project.clone());
        let shot_id = ShotId::new(identity.shot_id.clone());
        let shot_part_id = ShotPartId::new(identity.shot_part_id.clone());

        let view = projects.entry(project).or_default();
        view.shots
            .entry(shot_id.clone())
            .or_default()
            .insert(
                shot_part_id.clone(),
                ShotPart {
                    shot_id: shot_id.clone(),
                    shot_part_id: shot_part_id.clone(),
                },
            );
        view.shot_part_folders
            .insert((shot_id, shot_part_id), folder.id.clone());
    }

    projects
}

/// Best-effort project name for a `server.configuration` folder, read back
/// from its own metadata (written at creation time, spec.md §6).
fn server_configuration_project(folder: &Folder) -> Option<ProjectName> {
    folder
        .metadata
        .get("project")
        .and_then(|v| v.as_str())
        .map(|s| ProjectName::new(s.to_string()))
}

/// The set of devices that should hold a shot-part folder: the union of
/// device sets for every user granted access to `(shot_id, shot_part_id)`
/// (spec.md §4.4). A user with no registered devices contributes nothing —
/// access without an enrolled device is inert, not an error.
pub fn desired_folder_devices(
    shot_id: &ShotId,
    shot_part_id: &ShotPartId,
    users: &[User],
) -> BTreeSet<DeviceId> {
    users
        .iter()
        .filter(|u| u.has_access(shot_id, shot_part_id))
        .flat_map(|u| u.devices.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lance_core::FolderId;
    use serde_json::json;

    fn shot_part_folder(id: &str, project: &str, shot: &str, part: &str) -> Folder {
        let metadata = json!({
            "__ProjectManager_data__": {
                "type": "shotpart",
                "project": project,
                "shotid": shot,
                "shotpartid": part,
            }
        });
        Folder::new(FolderId::new(id), id, None, [], metadata)
    }

    #[test]
    fn groups_shot_parts_by_project_and_shot() {
        let folders = vec![
            shot_part_folder("f1", "proj-a", "sh01", "lighting"),
            shot_part_folder("f2", "proj-a", "sh01", "comp"),
            shot_part_folder("f3", "proj-b", "sh01", "lighting"),
        ];
        let projects = classify_folders(&folders);
        assert_eq!(projects.len(), 2);
        let proj_a = &projects[&ProjectName::new("proj-a")];
        assert_eq!(proj_a.shots.len(), 1);
        assert_eq!(proj_a.shots[&ShotId::new("sh01")].len(), 2);
    }

    #[test]
    fn folder_without_shot_part_metadata_is_ignored() {
        let folder = Folder::new(FolderId::new("f1"), "plain", None, [], serde_json::Value::Null);
        assert!(classify_folders(&[folder]).is_empty());
    }

    #[test]
    fn desired_devices_unions_access_grants() {
        let mut alice = User::new(lance_core::UserId::new("alice"), "Alice");
        alice.devices.insert(DeviceId::new("alice-laptop"));
        alice.grant(ShotId::new("sh01"), ShotPartId::new("lighting"));

        let mut bob = User::new(lance_core::UserId::new("bob"), "Bob");
        bob.devices.insert(DeviceId::new("bob-desktop"));
        bob.grant(ShotId::new("sh01"), ShotPartId::new("lighting"));

        let carol = User::new(lance_core::UserId::new("carol"), "Carol");

        let devices = desired_folder_devices(
            &ShotId::new("sh01"),
            &ShotPartId::new("lighting"),
            &[alice, bob, carol],
        );
        assert_eq!(devices.len(), 2);
        assert!(devices.contains(&DeviceId::new("alice-laptop")));
    }
}
