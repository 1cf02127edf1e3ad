// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use thiserror::Error;

use crate::documents::DocumentKind;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("path has no parent directory: {0}")]
    InvalidPath(PathBuf),

    #[error("expected {expected:?} document, found {found:?}")]
    WrongDocumentKind {
        expected: DocumentKind,
        found: DocumentKind,
    },
}
