//! Manifest error type

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    /// Persisted schema does not match this build
    ///
    /// `found` is the stored `version` value as JSON text, `missing` when absent.
    #[error("manifest version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u64, found: String },

    /// Persisted document is structurally invalid
    #[error("malformed manifest: {0}")]
    Malformed(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode manifest: {0}")]
    Json(#[from] serde_json::Error),

    /// Tree provider failed during an update pass
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

impl ManifestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether a caller should discard the persisted manifest and rebuild
    ///
    /// True for a missing file, a foreign schema version or a malformed
    /// document; other I/O failures should abort.
    pub fn is_rebuildable(&self) -> bool {
        match self {
            ManifestError::VersionMismatch { .. } | ManifestError::Malformed(_) => true,
            ManifestError::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            ManifestError::Json(_) | ManifestError::Provider(_) => false,
        }
    }
}
