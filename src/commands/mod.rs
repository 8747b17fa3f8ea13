pub mod run;
pub mod setup;
pub mod status;

use calsync_core::config::SyncConfig;
use calsync_core::session::Collaborators;

use crate::local::{CalendarDir, Mailbox, SnapshotFile};

/// The on-disk calendar and mailbox a config points at.
pub struct LocalAccount {
    pub calendar: CalendarDir,
    pub mailbox: Mailbox,
    pub snapshot: SnapshotFile,
}

impl LocalAccount {
    pub fn open(config: &SyncConfig) -> Self {
        let calendar_dir = config.calendar_path();
        LocalAccount {
            snapshot: SnapshotFile::in_calendar_dir(&calendar_dir),
            calendar: CalendarDir::new(calendar_dir),
            mailbox: Mailbox::new(config.mailbox_path()),
        }
    }

    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            calendar: &self.calendar,
            transport: &self.mailbox,
            inbound: &self.mailbox,
            snapshot: &self.snapshot,
        }
    }
}
