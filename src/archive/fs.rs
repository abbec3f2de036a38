//! File-system archive implementation
//!
//! Snapshots are stored content-addressed as `<dir>/<identity>.html`. Each
//! write goes to a temporary sibling first and is renamed into place, so a
//! snapshot file is either complete or absent.

use crate::archive::traits::{ArchiveError, ArchiveResult, SnapshotArchive};
use crate::config::OverwritePolicy;
use crate::fingerprint::Fingerprint;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Snapshot archive backed by a directory
#[derive(Debug, Clone)]
pub struct FsArchive {
    dir: PathBuf,
    policy: OverwritePolicy,
    retry_backoff: Duration,
}

impl FsArchive {
    /// Opens (creating if needed) an archive rooted at `dir`
    ///
    /// # Arguments
    ///
    /// * `dir` - Snapshot directory, normally `<run_dir>/snapshots`
    /// * `policy` - What a second write to the same identity does
    /// * `retry_backoff` - Delay before the single retry of a failed write
    pub async fn open(
        dir: impl Into<PathBuf>,
        policy: OverwritePolicy,
        retry_backoff: Duration,
    ) -> ArchiveResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| ArchiveError::Write {
                identity: "<archive root>".to_string(),
                path: dir.clone(),
                source,
            })?;

        Ok(Self {
            dir,
            policy,
            retry_backoff,
        })
    }

    /// Directory holding the snapshots
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of an identity's snapshot
    pub fn path_for(&self, identity: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{}.html", identity))
    }

    async fn write_atomic(&self, path: &Path, snapshot: &str) -> std::io::Result<()> {
        let tmp = path.with_extension("html.tmp");
        tokio::fs::write(&tmp, snapshot).await?;
        tokio::fs::rename(&tmp, path).await
    }
}

#[async_trait]
impl SnapshotArchive for FsArchive {
    async fn put(&self, identity: &Fingerprint, snapshot: &str) -> ArchiveResult<PathBuf> {
        let path = self.path_for(identity);

        if self.policy == OverwritePolicy::FirstWriteWins && self.exists(identity).await {
            tracing::trace!("Snapshot {} already archived, keeping first write", identity.short());
            return Ok(path);
        }

        if let Err(first) = self.write_atomic(&path, snapshot).await {
            tracing::warn!(
                "Snapshot write for {} failed ({}), retrying in {:?}",
                identity.short(),
                first,
                self.retry_backoff
            );
            tokio::time::sleep(self.retry_backoff).await;

            self.write_atomic(&path, snapshot)
                .await
                .map_err(|source| ArchiveError::Write {
                    identity: identity.to_string(),
                    path: path.clone(),
                    source,
                })?;
        }

        tracing::debug!("Archived snapshot {}", path.display());
        Ok(path)
    }

    async fn exists(&self, identity: &Fingerprint) -> bool {
        tokio::fs::metadata(self.path_for(identity)).await.is_ok()
    }

    async fn get(&self, identity: &Fingerprint) -> ArchiveResult<String> {
        match tokio::fs::read_to_string(self.path_for(identity)).await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ArchiveError::NotFound(identity.to_string()))
            }
            Err(source) => Err(ArchiveError::Read {
                identity: identity.to_string(),
                source,
            }),
        }
    }
}
