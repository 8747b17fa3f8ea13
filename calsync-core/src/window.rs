//! The rolling date window one run operates on.

use std::fmt;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::error::{CalSyncError, CalSyncResult};
use crate::occurrence::Occurrence;

/// Half-open interval `[start, end)`.
///
/// An occurrence belongs to the window when its start falls inside it.
/// Anything else is invisible to the run and left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl SyncWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> CalSyncResult<Self> {
        if start >= end {
            return Err(CalSyncError::Config(format!(
                "Sync window must not be empty ({} .. {})",
                start, end
            )));
        }
        Ok(SyncWindow { start, end })
    }

    /// Window from today's local midnight spanning `days` days.
    pub fn from_today(days: u32) -> CalSyncResult<Self> {
        Self::starting_on(Local::now().date_naive(), days, &Local)
    }

    /// Window from midnight of `date` in `tz`, spanning `days` days.
    pub fn starting_on<Tz: TimeZone>(date: NaiveDate, days: u32, tz: &Tz) -> CalSyncResult<Self> {
        let first = midnight_in(date, tz)?;
        let last_date = date
            .checked_add_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| CalSyncError::Config(format!("Sync range of {days} days overflows")))?;
        let last = midnight_in(last_date, tz)?;
        Self::new(first, last)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn contains_occurrence(&self, occurrence: &Occurrence) -> bool {
        self.contains(occurrence.start)
    }
}

impl fmt::Display for SyncWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} .. {}",
            self.start.format("%Y-%m-%d %H:%M UTC"),
            self.end.format("%Y-%m-%d %H:%M UTC")
        )
    }
}

/// Midnight at the start of `date` in `tz`, as UTC.
///
/// Where a DST transition skips midnight the first valid instant after the
/// gap is used.
pub(crate) fn midnight_in<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> CalSyncResult<DateTime<Utc>> {
    (0..=2)
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| CalSyncError::Config(format!("No valid local midnight on {date}")))
}
