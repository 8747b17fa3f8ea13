//! Resolving iCalendar date/time values to UTC instants.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use icalendar::parser::Property;
use icalendar::{CalendarDateTime, DatePerhapsTime};

use crate::window::midnight_in;

/// Common Windows zone names, as emitted by Outlook exports.
const WINDOWS_ZONES: &[(&str, &str)] = &[
    ("Pacific Standard Time", "America/Los_Angeles"),
    ("Mountain Standard Time", "America/Denver"),
    ("Central Standard Time", "America/Chicago"),
    ("Eastern Standard Time", "America/New_York"),
    ("GMT Standard Time", "Europe/London"),
    ("W. Europe Standard Time", "Europe/Berlin"),
    ("Romance Standard Time", "Europe/Paris"),
    ("Central Europe Standard Time", "Europe/Budapest"),
    ("E. Europe Standard Time", "Europe/Chisinau"),
    ("India Standard Time", "Asia/Kolkata"),
    ("China Standard Time", "Asia/Shanghai"),
    ("Tokyo Standard Time", "Asia/Tokyo"),
    ("AUS Eastern Standard Time", "Australia/Sydney"),
    ("UTC", "UTC"),
];

/// Look up a TZID as an IANA name, then as a Windows zone name.
pub(crate) fn lookup_tz(tzid: &str) -> Option<chrono_tz::Tz> {
    let tzid = tzid.trim_matches('"');
    tzid.parse().ok().or_else(|| {
        WINDOWS_ZONES
            .iter()
            .find(|(windows, _)| *windows == tzid)
            .and_then(|(_, iana)| iana.parse().ok())
    })
}

pub(crate) fn is_date(time: &DatePerhapsTime) -> bool {
    matches!(time, DatePerhapsTime::Date(_))
}

/// UTC instant of a parsed value. Dates resolve to local midnight, floating
/// times to local time, unknown zones fall back to local time.
pub(crate) fn to_utc(time: &DatePerhapsTime) -> Option<DateTime<Utc>> {
    match time {
        DatePerhapsTime::Date(d) => midnight_in(*d, &Local).ok(),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => Some(*dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => local_to_utc(naive),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            match lookup_tz(tzid) {
                Some(tz) => tz
                    .from_local_datetime(date_time)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc)),
                None => {
                    tracing::warn!(tzid, "unknown time zone, reading as local time");
                    local_to_utc(date_time)
                }
            }
        }
    }
}

fn local_to_utc(naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Split a multi-valued date property such as `EXDATE` into its values.
///
/// Handles `TZID=`, `VALUE=DATE`, UTC (`Z`) and floating values, with
/// several values separated by commas.
pub(crate) fn parse_date_list(prop: &Property) -> Vec<DatePerhapsTime> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    prop.val
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            if is_date {
                NaiveDate::parse_from_str(s, "%Y%m%d")
                    .ok()
                    .map(DatePerhapsTime::Date)
            } else if let Some(ref tzid) = tzid {
                NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|date_time| {
                        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone {
                            date_time,
                            tzid: tzid.clone(),
                        })
                    })
            } else if let Some(s) = s.strip_suffix('Z') {
                NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt.and_utc())))
            } else {
                NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| DatePerhapsTime::DateTime(CalendarDateTime::Floating(dt)))
            }
        })
        .collect()
}
