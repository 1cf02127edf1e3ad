// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event bus's sealed event type (spec.md §4.2, §4.3.5, §4.4).
//!
//! The original routes events by `isinstance`; per spec.md §9 REDESIGN
//! FLAGS this becomes a single tagged enum matched exhaustively by
//! processors, instead of a class hierarchy walked at runtime.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::device::Device;
use crate::folder::Folder;

/// Tag-only variant of [`Event`], used by processors that only need to
/// test membership in a class of events without matching out the payload
/// (mirrors `StepStatusKind` in the teacher's job state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    DevicesAdded,
    DevicesRemoved,
    DevicesChanged,
    DevicesVolatileDataChanged,
    FoldersAdded,
    FoldersRemoved,
    FoldersConfigurationChanged,
    FoldersVolatileDataChanged,
    FoldersSynced,
    ConfigSyncChanged,
    Syncthing,
}

/// Where an event originated, for logging and for distinguishing
/// externally-triggered mutations from sync-daemon-observed ones.
pub type EventSource = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    DevicesAdded { devices: Vec<Device>, source: EventSource },
    DevicesRemoved { devices: Vec<Device>, source: EventSource },
    DevicesChanged { devices: Vec<Device>, source: EventSource },
    DevicesVolatileDataChanged { devices: Vec<Device>, source: EventSource },

    FoldersAdded { folders: Vec<Folder>, source: EventSource },
    FoldersRemoved { folders: Vec<Folder>, source: EventSource },
    FoldersConfigurationChanged { folders: Vec<Folder>, source: EventSource },
    FoldersVolatileDataChanged { folders: Vec<Folder>, source: EventSource },
    FoldersSynced { folders: Vec<Folder>, source: EventSource },

    /// `in_sync` is the new aggregate config-sync state (spec.md §4.3.8).
    ConfigSyncChanged { in_sync: bool },

    /// Catch-all for sync-daemon events with no dedicated handling
    /// (spec.md §4.3.5 "Other" row): republished verbatim.
    Syncthing { event_type: String, data: Value },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::DevicesAdded { .. } => EventKind::DevicesAdded,
            Event::DevicesRemoved { .. } => EventKind::DevicesRemoved,
            Event::DevicesChanged { .. } => EventKind::DevicesChanged,
            Event::DevicesVolatileDataChanged { .. } => EventKind::DevicesVolatileDataChanged,
            Event::FoldersAdded { .. } => EventKind::FoldersAdded,
            Event::FoldersRemoved { .. } => EventKind::FoldersRemoved,
            Event::FoldersConfigurationChanged { .. } => EventKind::FoldersConfigurationChanged,
            Event::FoldersVolatileDataChanged { .. } => EventKind::FoldersVolatileDataChanged,
            Event::FoldersSynced { .. } => EventKind::FoldersSynced,
            Event::ConfigSyncChanged { .. } => EventKind::ConfigSyncChanged,
            Event::Syncthing { .. } => EventKind::Syncthing,
        }
    }

    /// True for any of the four `Folders*` variants the project manager
    /// subscribes to (spec.md §4.4: `FoldersConfigurationEvent ∪
    /// ConfigSyncChangedEvent`).
    pub fn is_project_manager_event(&self) -> bool {
        matches!(
            self.kind(),
            EventKind::FoldersAdded
                | EventKind::FoldersRemoved
                | EventKind::FoldersConfigurationChanged
                | EventKind::FoldersVolatileDataChanged
                | EventKind::FoldersSynced
                | EventKind::ConfigSyncChanged
        )
    }

    pub fn folders(&self) -> Option<&[Folder]> {
        match self {
            Event::FoldersAdded { folders, .. }
            | Event::FoldersRemoved { folders, .. }
            | Event::FoldersConfigurationChanged { folders, .. }
            | Event::FoldersVolatileDataChanged { folders, .. }
            | Event::FoldersSynced { folders, .. } => Some(folders),
            _ => None,
        }
    }
}
