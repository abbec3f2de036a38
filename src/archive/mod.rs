//! DOM archive store
//!
//! This module persists each distinct state's rendered DOM under its
//! identity, inside a directory scoped to one run and one browser engine:
//! - `SnapshotArchive`: the put/exists/get contract the explorer relies on
//! - `FsArchive`: content-addressed files under `<run_dir>/snapshots/`

mod fs;
mod traits;

pub use fs::FsArchive;
pub use traits::{ArchiveError, ArchiveResult, SnapshotArchive};
