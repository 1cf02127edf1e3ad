// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `config.cfg`: the persistent device/folder/user roster a server hands
//! out to its clients (spec.md §3, §6). Two flavors share one on-disk shape
//! (`RosterDocument`) so load/save code doesn't duplicate: a server's own
//! `server.configuration` folder holds the full roster; a client caches the
//! same document read-only after it last synced.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use lance_core::{Device, Folder, ProjectName, User};
use serde::{Deserialize, Serialize};

use crate::fs_atomic::{read_to_string_opt, write_atomic};
use crate::StorageError;

/// Document kind, recorded so a reader can tell a server's authoritative
/// roster apart from a project's shot/access roster at a glance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    ServerConfiguration,
    ProjectConfiguration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfigDocument {
    pub kind: DocumentKind,
    pub devices: Vec<Device>,
    pub folders: Vec<Folder>,
    pub users: Vec<User>,
}

impl ServerConfigDocument {
    pub fn new(devices: Vec<Device>, folders: Vec<Folder>, users: Vec<User>) -> Self {
        Self {
            kind: DocumentKind::ServerConfiguration,
            devices,
            folders,
            users,
        }
    }

    pub fn path(folder_root: &Path) -> PathBuf {
        folder_root.join("config.cfg")
    }

    pub fn load(folder_root: &Path) -> Result<Option<Self>, StorageError> {
        let Some(raw) = read_to_string_opt(&Self::path(folder_root))? else {
            return Ok(None);
        };
        let doc: Self = serde_json::from_str(&raw)?;
        if doc.kind != DocumentKind::ServerConfiguration {
            return Err(StorageError::WrongDocumentKind {
                expected: DocumentKind::ServerConfiguration,
                found: doc.kind,
            });
        }
        Ok(Some(doc))
    }

    pub fn save(&self, folder_root: &Path) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(&Self::path(folder_root), &json)
    }
}

/// A project's shot/access roster, held in the project's own
/// `project_<name>_configuration` folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfigDocument {
    pub kind: DocumentKind,
    pub project: ProjectName,
    pub shot_part_folders: BTreeSet<lance_core::FolderId>,
    pub users: Vec<User>,
}

impl ProjectConfigDocument {
    pub fn new(
        project: ProjectName,
        shot_part_folders: BTreeSet<lance_core::FolderId>,
        users: Vec<User>,
    ) -> Self {
        Self {
            kind: DocumentKind::ProjectConfiguration,
            project,
            shot_part_folders,
            users,
        }
    }

    pub fn path(folder_root: &Path) -> PathBuf {
        folder_root.join("config.cfg")
    }

    pub fn load(folder_root: &Path) -> Result<Option<Self>, StorageError> {
        let Some(raw) = read_to_string_opt(&Self::path(folder_root))? else {
            return Ok(None);
        };
        let doc: Self = serde_json::from_str(&raw)?;
        if doc.kind != DocumentKind::ProjectConfiguration {
            return Err(StorageError::WrongDocumentKind {
                expected: DocumentKind::ProjectConfiguration,
                found: doc.kind,
            });
        }
        Ok(Some(doc))
    }

    pub fn save(&self, folder_root: &Path) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(&Self::path(folder_root), &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lance_core::{DeviceId, FolderId};
    use tempfile::tempdir;

    #[test]
    fn server_document_roundtrips() {
        let dir = tempdir().unwrap();
        let doc = ServerConfigDocument::new(
            vec![Device::new(DeviceId::new("d1"), None, 0)],
            vec![],
            vec![],
        );
        doc.save(dir.path()).unwrap();
        let loaded = ServerConfigDocument::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn project_document_rejects_server_document_path() {
        let dir = tempdir().unwrap();
        let server_doc = ServerConfigDocument::new(vec![], vec![], vec![]);
        server_doc.save(dir.path()).unwrap();
        let err = ProjectConfigDocument::load(dir.path()).unwrap_err();
        assert!(matches!(err, StorageError::WrongDocumentKind { .. }));
    }

    #[test]
    fn project_document_roundtrips() {
        let dir = tempdir().unwrap();
        let mut parts = BTreeSet::new();
        parts.insert(FolderId::new("f1"));
        let doc = ProjectConfigDocument::new(ProjectName::new("demo"), parts, vec![]);
        doc.save(dir.path()).unwrap();
        let loaded = ProjectConfigDocument::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, doc);
    }
}
