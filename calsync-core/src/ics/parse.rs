//! Decoding calendar attachments into occurrences, using the icalendar
//! crate's parser.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use icalendar::DatePerhapsTime;
use icalendar::parser::{Component, read_calendar, unfold};

use crate::error::{CalSyncError, CalSyncResult};
use crate::ics::time::{is_date, parse_date_list, to_utc};
use crate::occurrence::{BusyState, Occurrence, SyncTag};
use crate::recurrence::expand_series;
use crate::window::SyncWindow;

/// One VEVENT, resolved but not yet expanded.
struct ParsedEvent {
    uid: Option<String>,
    start: DatePerhapsTime,
    first: Occurrence,
    duration: Duration,
    rrule: Option<String>,
    exdates: Vec<DatePerhapsTime>,
    recurrence_id: Option<DateTime<Utc>>,
    cancelled: bool,
}

/// Decode calendar data into the occurrences that start inside `window`.
///
/// Recurring series are expanded. A VEVENT that cannot be resolved is
/// skipped with a warning; data that is not a calendar at all is an error.
pub fn parse_occurrences(data: &[u8], window: &SyncWindow) -> CalSyncResult<Vec<Occurrence>> {
    let text = decode_text(data)?;
    if !text.to_ascii_uppercase().contains("BEGIN:VCALENDAR") {
        return Err(CalSyncError::IcsParse("No VCALENDAR in calendar data".into()));
    }
    let unfolded = unfold(&text);
    let calendar = read_calendar(&unfolded).map_err(|e| CalSyncError::IcsParse(e.to_string()))?;

    let mut vevents = Vec::new();
    collect_vevents(&calendar.components, &mut vevents);

    let events: Vec<ParsedEvent> = vevents.into_iter().filter_map(parse_vevent).collect();

    // Instances replaced by an override (or cancelled through one) are not
    // generated from their series.
    let overridden: HashSet<(Option<&str>, DateTime<Utc>)> = events
        .iter()
        .filter_map(|e| Some((e.uid.as_deref(), e.recurrence_id?)))
        .collect();

    let mut occurrences = Vec::new();
    for event in &events {
        if event.cancelled {
            continue;
        }
        match &event.rrule {
            Some(rrule) if event.recurrence_id.is_none() => {
                let starts = match expand_series(&event.start, rrule, &event.exdates, window) {
                    Ok(starts) => starts,
                    Err(e) => {
                        tracing::warn!(uid = ?event.uid, error = %e, "skipping recurring event");
                        continue;
                    }
                };
                for start in starts
                    .into_iter()
                    .filter(|s| !overridden.contains(&(event.uid.as_deref(), *s)))
                {
                    let Some(end) = start.checked_add_signed(event.duration) else {
                        tracing::warn!(uid = ?event.uid, %start, "skipping instance whose end is out of range");
                        continue;
                    };
                    occurrences.push(event.first.clone().with_times(start, end));
                }
            }
            _ => {
                if window.contains_occurrence(&event.first) {
                    occurrences.push(event.first.clone());
                }
            }
        }
    }

    occurrences.sort_by_key(Occurrence::fingerprint);
    Ok(occurrences)
}

/// Attachments are usually UTF-8; Outlook sometimes hands out UTF-16.
fn decode_text(data: &[u8]) -> CalSyncResult<String> {
    let utf16 = |bytes: &[u8], to_unit: fn([u8; 2]) -> u16| {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| to_unit([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units)
            .map_err(|e| CalSyncError::IcsParse(format!("Invalid UTF-16 calendar data: {e}")))
    };

    match data {
        [0xFF, 0xFE, rest @ ..] => utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => utf16(rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8(rest.to_vec())
            .map_err(|e| CalSyncError::IcsParse(format!("Invalid UTF-8 calendar data: {e}"))),
        _ => String::from_utf8(data.to_vec())
            .map_err(|e| CalSyncError::IcsParse(format!("Invalid UTF-8 calendar data: {e}"))),
    }
}

fn collect_vevents<'a, 'b>(components: &'b [Component<'a>], out: &mut Vec<&'b Component<'a>>) {
    for component in components {
        if component.name == "VEVENT" {
            out.push(component);
        } else if component.name == "VCALENDAR" {
            collect_vevents(&component.components, out);
        }
    }
}

fn parse_vevent(vevent: &Component<'_>) -> Option<ParsedEvent> {
    let uid = vevent.find_prop("UID").map(|p| p.val.to_string());

    let Some(start) = vevent
        .find_prop("DTSTART")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
    else {
        tracing::warn!(?uid, "skipping VEVENT without a usable DTSTART");
        return None;
    };
    let all_day = is_date(&start);
    let Some(start_utc) = to_utc(&start) else {
        tracing::warn!(?uid, "skipping VEVENT whose DTSTART does not exist locally");
        return None;
    };

    let end_utc = if let Some(prop) = vevent.find_prop("DTEND") {
        DatePerhapsTime::try_from(prop).ok().and_then(|t| to_utc(&t))
    } else if let Some(prop) = vevent.find_prop("DURATION") {
        parse_duration(prop.val.as_ref()).and_then(|d| start_utc.checked_add_signed(d))
    } else if all_day {
        // RFC 5545: a date lasts one day, a date-time is instantaneous.
        start_utc.checked_add_signed(Duration::days(1))
    } else {
        Some(start_utc)
    };
    let Some(end_utc) = end_utc.filter(|end| *end >= start_utc) else {
        tracing::warn!(?uid, "skipping VEVENT with an invalid end");
        return None;
    };

    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| p.val.to_string())
        .unwrap_or_default();

    let tagged = vevent
        .properties
        .iter()
        .filter(|p| p.name == "CATEGORIES")
        .any(|p| SyncTag::is_in_categories(p.val.as_ref()));

    let reminders = vevent.components.iter().any(|c| c.name == "VALARM");

    let mut first = if tagged {
        Occurrence::synced(start_utc, end_utc)
    } else {
        Occurrence::new(start_utc, end_utc, &summary)
    }
    .with_busy_state(busy_state(vevent))
    .with_all_day(all_day)
    .with_reminders(reminders);
    first.summary = summary;

    let exdates = vevent
        .properties
        .iter()
        .filter(|p| p.name == "EXDATE")
        .flat_map(parse_date_list)
        .collect();

    let recurrence_id = vevent
        .find_prop("RECURRENCE-ID")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .and_then(|t| to_utc(&t));

    let cancelled = vevent
        .find_prop("STATUS")
        .is_some_and(|p| p.val.as_ref().eq_ignore_ascii_case("CANCELLED"));

    Some(ParsedEvent {
        uid,
        start,
        duration: end_utc - start_utc,
        first,
        rrule: vevent.find_prop("RRULE").map(|p| p.val.to_string()),
        exdates,
        recurrence_id,
        cancelled,
    })
}

/// Busy state from the Outlook extension, else from TRANSP and STATUS.
fn busy_state(vevent: &Component<'_>) -> BusyState {
    if let Some(prop) = vevent.find_prop("X-MICROSOFT-CDO-BUSYSTATUS") {
        return BusyState::from_cdo_str(prop.val.as_ref()).unwrap_or(BusyState::Unknown);
    }

    let transparent = vevent
        .find_prop("TRANSP")
        .is_some_and(|p| p.val.as_ref().eq_ignore_ascii_case("TRANSPARENT"));
    let tentative = vevent
        .find_prop("STATUS")
        .is_some_and(|p| p.val.as_ref().eq_ignore_ascii_case("TENTATIVE"));

    if transparent {
        BusyState::Free
    } else if tentative {
        BusyState::Tentative
    } else {
        BusyState::Busy
    }
}

/// Parse a non-negative DURATION value (`PT1H30M`, `P1D`, `+P1W`).
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim().trim_start_matches('+');
    if value.starts_with('-') {
        return None;
    }
    let duration = iso8601::duration(value).ok()?;
    let std_duration: std::time::Duration = duration.into();
    Duration::from_std(std_duration).ok()
}
