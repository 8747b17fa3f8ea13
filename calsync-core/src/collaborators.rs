//! Narrow interfaces to the systems calsync does not own: the calendar
//! store, the mail transport, the inbound message folder and the record of
//! the last sent snapshot.
//!
//! Implementations hand the core materialized collections; the core never
//! holds references into their object graphs beyond one call.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CalSyncResult;
use crate::occurrence::Occurrence;
use crate::window::SyncWindow;

/// Which occurrences a store query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFilter {
    Any,
    /// Only occurrences carrying the sync tag.
    SyncedOnly,
    /// Only occurrences without the sync tag.
    UserOnly,
}

impl TagFilter {
    pub fn accepts(&self, occurrence: &Occurrence) -> bool {
        match self {
            TagFilter::Any => true,
            TagFilter::SyncedOnly => occurrence.is_tagged(),
            TagFilter::UserOnly => !occurrence.is_tagged(),
        }
    }
}

pub trait CalendarStore {
    /// Occurrences starting inside `window`, recurring series expanded.
    fn query_occurrences(
        &self,
        window: &SyncWindow,
        filter: TagFilter,
    ) -> CalSyncResult<Vec<Occurrence>>;

    /// Persist a new occurrence and return it with its store id set.
    fn create(&self, occurrence: &Occurrence) -> CalSyncResult<Occurrence>;

    fn delete(&self, occurrence: &Occurrence) -> CalSyncResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MailFolder {
    Inbox,
    Outbox,
    Sent,
    DeletedItems,
    Named(String),
}

impl MailFolder {
    pub fn dir_name(&self) -> &str {
        match self {
            MailFolder::Inbox => "Inbox",
            MailFolder::Outbox => "Outbox",
            MailFolder::Sent => "Sent",
            MailFolder::DeletedItems => "DeletedItems",
            MailFolder::Named(name) => name,
        }
    }
}

impl fmt::Display for MailFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub data: Vec<u8>,
}

/// A message as seen in a mail folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub id: String,
    pub subject: String,
    pub received_at: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
}

pub trait MailTransport {
    fn send_message(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment: &Attachment,
    ) -> CalSyncResult<()>;

    /// Delete every message in `folder` whose subject equals `subject`.
    /// Returns how many were deleted.
    fn delete_messages_matching(&self, folder: &MailFolder, subject: &str) -> CalSyncResult<usize>;
}

pub trait InboundSource {
    fn list_messages(&self, folder: &MailFolder) -> CalSyncResult<Vec<InboundMessage>>;

    fn delete_message(&self, folder: &MailFolder, id: &str) -> CalSyncResult<()>;
}

/// Where the last successfully sent outbound snapshot is kept.
pub trait SnapshotStore {
    /// Raw calendar data of the last sent attachment, `None` before the
    /// first send.
    fn load(&self) -> CalSyncResult<Option<Vec<u8>>>;

    fn save(&self, data: &[u8]) -> CalSyncResult<()>;
}
