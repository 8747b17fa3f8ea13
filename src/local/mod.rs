//! Filesystem-backed collaborators.

mod calendar_dir;
mod mailbox;
mod snapshot;

pub use calendar_dir::CalendarDir;
pub use mailbox::Mailbox;
pub use snapshot::SnapshotFile;
