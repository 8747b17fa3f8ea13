//! RRULE expansion for recurring events.
//!
//! Expands a series into the instance start times that fall inside the sync
//! window, honouring EXDATEs. Instance overrides are applied by the caller.

use chrono::{DateTime, Duration, Local, Utc};
use icalendar::{CalendarDateTime, DatePerhapsTime};
use rrule::RRuleSet;

use crate::error::{CalSyncError, CalSyncResult};
use crate::ics::time::{lookup_tz, to_utc};
use crate::window::{SyncWindow, midnight_in};

const MAX_INSTANCES: u16 = 2000;

/// `DTSTART`/`EXDATE` value in the form the rrule parser accepts.
///
/// All-day values become midnight UTC; converting back goes through
/// [`instance_to_utc`]. Floating times and zones the rrule crate cannot
/// name are pinned to UTC first.
fn rrule_value(time: &DatePerhapsTime) -> Option<String> {
    match time {
        DatePerhapsTime::Date(d) => Some(format!(":{}T000000Z", d.format("%Y%m%d"))),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            match lookup_tz(tzid) {
                Some(tz) => Some(format!(
                    ";TZID={}:{}",
                    tz.name(),
                    date_time.format("%Y%m%dT%H%M%S")
                )),
                None => to_utc(time).map(|dt| format!(":{}", dt.format("%Y%m%dT%H%M%SZ"))),
            }
        }
        DatePerhapsTime::DateTime(_) => {
            to_utc(time).map(|dt| format!(":{}", dt.format("%Y%m%dT%H%M%SZ")))
        }
    }
}

fn build_rrule_string(
    start: &DatePerhapsTime,
    rrule: &str,
    exdates: &[DatePerhapsTime],
) -> Option<String> {
    let mut lines = vec![format!("DTSTART{}", rrule_value(start)?)];
    lines.push(format!("RRULE:{rrule}"));

    for exdate in exdates {
        // EXDATEs of an all-day series are dates too; a datetime would never match.
        let exdate = match (start, exdate) {
            (DatePerhapsTime::Date(_), DatePerhapsTime::DateTime(_)) => {
                DatePerhapsTime::Date(to_utc(exdate)?.with_timezone(&Local).date_naive())
            }
            _ => exdate.clone(),
        };
        if let Some(value) = rrule_value(&exdate) {
            lines.push(format!("EXDATE{value}"));
        }
    }

    Some(lines.join("\n"))
}

fn instance_to_utc(dt: &DateTime<rrule::Tz>, master_start: &DatePerhapsTime) -> Option<DateTime<Utc>> {
    match master_start {
        DatePerhapsTime::Date(_) => midnight_in(dt.date_naive(), &Local).ok(),
        DatePerhapsTime::DateTime(_) => Some(dt.with_timezone(&Utc)),
    }
}

/// Start times of the instances of a series that begin inside `window`.
pub fn expand_series(
    start: &DatePerhapsTime,
    rrule: &str,
    exdates: &[DatePerhapsTime],
    window: &SyncWindow,
) -> CalSyncResult<Vec<DateTime<Utc>>> {
    let rrule_str = build_rrule_string(start, rrule, exdates).ok_or_else(|| {
        CalSyncError::IcsParse(format!("Unresolvable DTSTART for RRULE '{rrule}'"))
    })?;

    let rrule_set: RRuleSet = rrule_str
        .parse()
        .map_err(|e| CalSyncError::IcsParse(format!("Failed to parse RRULE '{rrule}': {e}")))?;

    // Widened by a day on each side: all-day instances are generated at UTC
    // midnight and only land on local midnight after conversion.
    let tz: rrule::Tz = Utc.into();
    let after = (window.start() - Duration::days(1)).with_timezone(&tz);
    let before = (window.end() + Duration::days(1)).with_timezone(&tz);

    let result = rrule_set.after(after).before(before).all(MAX_INSTANCES);
    if result.limited {
        tracing::warn!(rrule, limit = MAX_INSTANCES, "recurrence truncated");
    }

    Ok(result
        .dates
        .iter()
        .filter_map(|dt| instance_to_utc(dt, start))
        .filter(|dt| window.contains(*dt))
        .collect())
}
