// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn dev(id: &str, name: Option<&str>, added_at: u64) -> Device {
    Device::new(DeviceId::new(id), name.map(str::to_string), added_at)
}

#[test]
fn display_name_falls_back_to_short_id() {
    let d = dev("abcdefghij", None, 0);
    assert_eq!(d.display_name(), "device abcdef");
}

#[test]
fn display_name_uses_name_when_set() {
    let d = dev("abcdefghij", Some("laptop"), 0);
    assert_eq!(d.display_name(), "laptop");
}

#[test]
fn equality_includes_added_at() {
    let a = dev("x", None, 1);
    let b = dev("x", None, 2);
    assert_ne!(a, b, "added_at discriminates re-adds (spec.md §9)");
}

#[test]
fn equality_ignores_volatile_data() {
    let mut a = dev("x", None, 1);
    let b = dev("x", None, 1);
    a.volatile.connected = true;
    assert_eq!(a, b);
}

#[test]
fn configuration_hash_ignores_added_at_and_delete_after() {
    let mut a = dev("x", Some("n"), 1);
    let mut b = dev("x", Some("n"), 999);
    b.schedule_for_deletion(5);
    assert_eq!(a.configuration_hash(), b.configuration_hash());
    a.schedule_for_deletion(1);
}

#[test]
fn configuration_hash_depends_on_name() {
    let a = dev("x", Some("n1"), 1);
    let b = dev("x", Some("n2"), 1);
    assert_ne!(a.configuration_hash(), b.configuration_hash());
}

#[test]
fn schedule_for_deletion_is_idempotent_on_first_timestamp() {
    let mut d = dev("x", None, 0);
    d.schedule_for_deletion(10);
    d.schedule_for_deletion(20);
    assert_eq!(d.delete_after, Some(10));
}

#[test]
fn unschedule_clears_deletion() {
    let mut d = dev("x", None, 0);
    d.schedule_for_deletion(10);
    d.unschedule_for_deletion();
    assert!(!d.is_scheduled_for_deletion());
}

#[test]
fn replace_with_preserves_volatile_and_identity_fields() {
    let mut a = dev("x", Some("old"), 1);
    a.volatile.connected = true;
    let b = dev("x", Some("new"), 1);
    a.replace_with(&b);
    assert_eq!(a.name.as_deref(), Some("new"));
    assert!(a.volatile.connected, "volatile data must survive replace_with");
}

#[test]
fn serde_roundtrip_skips_volatile() {
    let mut d = dev("x", Some("n"), 42);
    d.volatile.connected = true;
    let json = serde_json::to_string(&d).unwrap();
    let back: Device = serde_json::from_str(&json).unwrap();
    assert!(!back.volatile.connected);
    assert_eq!(back.id, d.id);
    assert_eq!(back.added_at, 42);
}
