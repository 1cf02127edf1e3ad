// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn folder(id: &str, label: &str, devices: &[&str]) -> Folder {
    Folder::new(
        FolderId::new(id),
        label,
        None,
        devices.iter().map(|d| DeviceId::new(*d)),
        Value::Null,
    )
}

#[test]
fn shot_part_identity_parses_metadata() {
    let mut f = folder("f1", "l", &[]);
    f.metadata = json!({
        "__ProjectManager_data__": {
            "type": "shotpart",
            "project": "proj",
            "shotid": "shotA",
            "shotpartid": "main",
        }
    });
    let ident = f.shot_part_identity().unwrap();
    assert_eq!(ident.project, "proj");
    assert_eq!(ident.shot_id, "shotA");
    assert_eq!(ident.shot_part_id, "main");
}

#[test]
fn shot_part_identity_none_for_plain_folder() {
    let f = folder("f1", "l", &[]);
    assert!(f.shot_part_identity().is_none());
}

#[test]
fn is_server_configuration_checks_metadata_type() {
    let mut f = folder("f1", "l", &[]);
    f.metadata = json!({"type": "server.configuration"});
    assert!(f.is_server_configuration());
}

#[test]
fn configuration_hash_ignores_device_order() {
    let a = folder("f1", "l", &["d1", "d2"]);
    let b = folder("f1", "l", &["d2", "d1"]);
    assert_eq!(a.configuration_hash(), b.configuration_hash());
}

#[test]
fn configuration_hash_changes_with_membership() {
    let a = folder("f1", "l", &["d1"]);
    let b = folder("f1", "l", &["d1", "d2"]);
    assert_ne!(a.configuration_hash(), b.configuration_hash());
}

#[test]
fn configuration_hash_ignores_local_path() {
    let mut a = folder("f1", "l", &["d1"]);
    let b = folder("f1", "l", &["d1"]);
    a.local_path = Some("/tmp/whatever".into());
    assert_eq!(a.configuration_hash(), b.configuration_hash());
}

#[test]
fn local_path_is_never_serialized() {
    let mut f = folder("f1", "l", &[]);
    f.local_path = Some("/secret/local/path".into());
    let json = serde_json::to_string(&f).unwrap();
    assert!(!json.contains("secret"));
}

#[test]
fn replace_with_preserves_volatile_data() {
    let mut a = folder("f1", "l", &["d1"]);
    a.volatile.need_total_items = 3;
    let b = folder("f1", "l2", &["d1", "d2"]);
    a.replace_with(&b);
    assert_eq!(a.label, "l2");
    assert_eq!(a.volatile.need_total_items, 3);
}

#[test]
fn is_synced_when_nothing_needed() {
    let mut f = folder("f1", "l", &[]);
    f.volatile.need_total_items = 4;
    assert!(!f.is_synced());
    f.volatile.need_total_items = 0;
    assert!(f.is_synced());
}
