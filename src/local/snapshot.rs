//! The last sent attachment, kept beside the calendar.

use std::path::PathBuf;

use calsync_core::CalSyncResult;
use calsync_core::collaborators::SnapshotStore;

const STATE_DIR: &str = ".calsync";
const SNAPSHOT_FILE: &str = "last_sent.ics";

pub struct SnapshotFile {
    dir: PathBuf,
}

impl SnapshotFile {
    /// Snapshot under `<calendar_dir>/.calsync/`.
    pub fn in_calendar_dir(calendar_dir: impl Into<PathBuf>) -> Self {
        SnapshotFile {
            dir: calendar_dir.into().join(STATE_DIR),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }
}

impl SnapshotStore for SnapshotFile {
    fn load(&self) -> CalSyncResult<Option<Vec<u8>>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read(&path)?))
    }

    fn save(&self, data: &[u8]) -> CalSyncResult<()> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.path();
        let temp = self.dir.join(SNAPSHOT_FILE.to_string() + ".tmp");
        std::fs::write(&temp, data)?;
        std::fs::rename(&temp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_saved_yet() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SnapshotFile::in_calendar_dir(dir.path()).load().unwrap().is_none());
    }

    #[test]
    fn save_replaces_the_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotFile::in_calendar_dir(dir.path());

        snapshot.save(b"first").unwrap();
        snapshot.save(b"second").unwrap();

        assert_eq!(snapshot.load().unwrap().as_deref(), Some(&b"second"[..]));
        assert!(dir.path().join(".calsync/last_sent.ics").exists());
        assert!(!dir.path().join(".calsync/last_sent.ics.tmp").exists());
    }
}
