//! The normalized calendar occurrence shared by every other module.
//!
//! Stores and codecs convert whatever they hold into [`Occurrence`] values;
//! filtering, change detection and reconciliation work exclusively on them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;

/// Summary written in place of the real subject whenever an occurrence
/// crosses the email boundary, in either direction.
pub const PLACEHOLDER_SUMMARY: &str = "Busy";

/// Free/busy status of an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusyState {
    Free,
    Busy,
    Tentative,
    OutOfOffice,
    Unknown,
}

impl BusyState {
    /// Parse an `X-MICROSOFT-CDO-BUSYSTATUS` value.
    pub fn from_cdo_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FREE" => Some(BusyState::Free),
            "BUSY" => Some(BusyState::Busy),
            "TENTATIVE" => Some(BusyState::Tentative),
            "OOF" => Some(BusyState::OutOfOffice),
            _ => None,
        }
    }

    /// Value for `X-MICROSOFT-CDO-BUSYSTATUS`, if the state has one.
    pub fn as_cdo_str(&self) -> Option<&'static str> {
        match self {
            BusyState::Free => Some("FREE"),
            BusyState::Busy => Some("BUSY"),
            BusyState::Tentative => Some("TENTATIVE"),
            BusyState::OutOfOffice => Some("OOF"),
            BusyState::Unknown => None,
        }
    }
}

/// Who created an occurrence. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    UserCreated,
    SystemSynced,
}

/// Marker carried by every occurrence this system created, stored as a
/// calendar category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncTag(String);

impl SyncTag {
    pub const CATEGORY: &'static str = "[Calendar Sync]";

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a comma-separated `CATEGORIES` value carries the tag.
    pub fn is_in_categories(categories: &str) -> bool {
        categories
            .split(',')
            .any(|c| c.trim() == Self::CATEGORY)
    }
}

impl Default for SyncTag {
    fn default() -> Self {
        SyncTag(Self::CATEGORY.to_string())
    }
}

/// One calendar time block.
///
/// `PartialEq` is structural. Sync decisions never use it: two occurrences
/// are "the same event" when their [`Fingerprint`]s match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Store-assigned identity, `None` until the store has created it.
    pub id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_all_day: bool,
    pub busy_state: BusyState,
    pub summary: String,
    pub reminders: bool,
    origin: Origin,
    sync_tag: Option<SyncTag>,
}

impl Occurrence {
    /// A user-created, timed, busy occurrence.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, summary: &str) -> Self {
        Occurrence {
            id: None,
            start,
            end,
            is_all_day: false,
            busy_state: BusyState::Busy,
            summary: summary.to_string(),
            reminders: false,
            origin: Origin::UserCreated,
            sync_tag: None,
        }
    }

    /// A system-owned mirror of a remote busy block: tagged, anonymized and
    /// without reminders.
    pub fn synced(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Occurrence {
            id: None,
            start,
            end,
            is_all_day: false,
            busy_state: BusyState::Busy,
            summary: PLACEHOLDER_SUMMARY.to_string(),
            reminders: false,
            origin: Origin::SystemSynced,
            sync_tag: Some(SyncTag::default()),
        }
    }

    pub fn with_busy_state(mut self, busy_state: BusyState) -> Self {
        self.busy_state = busy_state;
        self
    }

    pub fn with_all_day(mut self, is_all_day: bool) -> Self {
        self.is_all_day = is_all_day;
        self
    }

    pub fn with_reminders(mut self, reminders: bool) -> Self {
        self.reminders = reminders;
        self
    }

    pub fn with_times(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn sync_tag(&self) -> Option<&SyncTag> {
        self.sync_tag.as_ref()
    }

    /// True only for occurrences this system created and may delete.
    pub fn is_tagged(&self) -> bool {
        self.origin == Origin::SystemSynced && self.sync_tag.is_some()
    }

    /// Whether the occurrence covers any time at all.
    pub fn has_extent(&self) -> bool {
        self.end > self.start
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }

    /// Copy with the subject replaced by the placeholder.
    pub fn anonymized(&self) -> Self {
        Occurrence {
            summary: PLACEHOLDER_SUMMARY.to_string(),
            ..self.clone()
        }
    }

    /// The system-owned copy to create locally for a remote occurrence.
    pub fn to_synced(&self) -> Self {
        Occurrence::synced(self.start, self.end)
            .with_busy_state(self.busy_state)
            .with_all_day(self.is_all_day)
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} {}",
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M"),
            self.summary
        )
    }
}
