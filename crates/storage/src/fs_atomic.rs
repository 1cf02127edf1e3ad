// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic file writes: write to a sibling `.tmp` file, fsync it, then rename
//! over the destination. Every on-disk document in this crate goes through
//! this path so a crash mid-write never leaves a half-written `config.cfg`
//! or hash file behind.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::StorageError;

pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let parent = path
        .parent()
        .ok_or_else(|| StorageError::InvalidPath(path.to_path_buf()))?;
    std::fs::create_dir_all(parent)?;

    let tmp_path = path.with_extension("tmp");
    {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(data)?;
        tmp.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;

    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }
    Ok(())
}

pub fn read_to_string_opt(path: &Path) -> Result<Option<String>, StorageError> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_atomic_creates_parent_and_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("file.json");
        write_atomic(&path, b"hello").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn write_atomic_overwrites_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn read_to_string_opt_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert_eq!(read_to_string_opt(&path).unwrap(), None);
    }
}
