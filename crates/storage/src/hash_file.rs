// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `<data_root>/config_sync/hash`: the last configuration hash this host
//! observed from its server, written after every successful sync poll so a
//! restart can compare against the server's current hash without waiting
//! for a fresh event (spec.md §4.3.8, §7 device-deletion protocol).

use std::path::{Path, PathBuf};

use crate::fs_atomic::{read_to_string_opt, write_atomic};
use crate::StorageError;

pub fn path(data_root: &Path) -> PathBuf {
    data_root.join("config_sync").join("hash")
}

pub fn load(data_root: &Path) -> Result<Option<String>, StorageError> {
    Ok(read_to_string_opt(&path(data_root))?.map(|s| s.trim().to_string()))
}

pub fn save(data_root: &Path, hash: &str) -> Result<(), StorageError> {
    write_atomic(&path(data_root), hash.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_hash_file_is_none() {
        let dir = tempdir().unwrap();
        assert_eq!(load(dir.path()).unwrap(), None);
    }

    #[test]
    fn save_then_load_roundtrips_trimmed() {
        let dir = tempdir().unwrap();
        save(dir.path(), "abc123\n").unwrap();
        assert_eq!(load(dir.path()).unwrap(), Some("abc123".to_string()));
    }
}
