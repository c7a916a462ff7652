use std::{
    fs,
    path::{Path, PathBuf},
};

use agolvault_core::time::Timestamp;
use serde_json::Value;

use crate::AppError;

/// One backup run's output directory, stamped at session start. The stamp is
/// taken once and threaded through everything that builds a path, so every
/// artifact of a run lands under the same directory.
pub struct BackupSession {
    root: PathBuf,
    stamp: String,
}

impl BackupSession {
    /// Creates `{save_location}/backup/{stamp}/`. The `backup` parent may
    /// pre-exist from earlier runs; the stamped leaf must not.
    pub fn create(
        save_location: impl AsRef<Path>,
        started_at: Timestamp,
    ) -> Result<Self, AppError> {
        let stamp = started_at.backup_stamp();
        let parent = save_location.as_ref().join("backup");
        fs::create_dir_all(&parent)?;

        let root = parent.join(&stamp);
        fs::create_dir(&root)?;
        log::debug!("backup session directory {}", root.display());

        Ok(Self { root, stamp })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    /// Persist the raw content listing before any export runs; the snapshot
    /// records what existed at backup time regardless of what the export
    /// step later manages to materialize.
    pub fn write_item_snapshot(&self, listing: &Value) -> Result<PathBuf, AppError> {
        let path = self.root.join(format!("itemdata-{}.json", self.stamp));
        fs::write(&path, serde_json::to_string_pretty(listing)?)?;
        Ok(path)
    }
}
