//! Archive trait and error types

use crate::fingerprint::Fingerprint;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during archive operations
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("No snapshot archived for {0}")]
    NotFound(String),

    #[error("Failed to write snapshot {identity} to {}: {source}", path.display())]
    Write {
        identity: String,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read snapshot {identity}: {source}")]
    Read {
        identity: String,
        source: std::io::Error,
    },
}

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Durable per-identity storage of rendered snapshots
#[async_trait]
pub trait SnapshotArchive: Send + Sync {
    /// Stores a snapshot and returns where it lives
    ///
    /// Re-putting an identity follows the archive's overwrite policy; either
    /// way the returned path is the identity's single location.
    async fn put(&self, identity: &Fingerprint, snapshot: &str) -> ArchiveResult<PathBuf>;

    /// Checks whether a snapshot exists for an identity
    async fn exists(&self, identity: &Fingerprint) -> bool;

    /// Reads a snapshot back
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The exact content that was stored
    /// * `Err(ArchiveError::NotFound)` - Nothing archived under this identity
    async fn get(&self, identity: &Fingerprint) -> ArchiveResult<String>;
}
