//! ICS generation for outbound attachments and stored events.

use chrono::{DateTime, Local, Utc};
use icalendar::{Alarm, Calendar, Component, EventLike, Property, Trigger, ValueType};

use crate::occurrence::{BusyState, Occurrence};

const REMINDER_MINUTES: i64 = 15;

/// Outbound attachment: one VEVENT per occurrence.
///
/// UIDs derive from the fingerprint, so the same busy block keeps its UID
/// across messages.
pub fn generate_calendar(occurrences: &[Occurrence]) -> String {
    let mut cal = Calendar::new();
    for occurrence in occurrences {
        cal.push(build_event(occurrence, &fingerprint_uid(occurrence)));
    }
    serialize(cal.done())
}

/// A single stored event, as kept by a file-backed calendar store.
pub fn generate_stored_event(occurrence: &Occurrence, uid: &str) -> String {
    let mut cal = Calendar::new();
    cal.push(build_event(occurrence, uid));
    serialize(cal.done())
}

fn build_event(occurrence: &Occurrence, uid: &str) -> icalendar::Event {
    let mut event = icalendar::Event::new();
    event.uid(uid);
    event.summary(&occurrence.summary);
    event.add_property("DTSTAMP", Utc::now().format("%Y%m%dT%H%M%SZ").to_string());

    add_time_property(&mut event, "DTSTART", occurrence.start, occurrence.is_all_day);
    add_time_property(&mut event, "DTEND", occurrence.end, occurrence.is_all_day);

    // TRANSP - only emit if TRANSPARENT (OPAQUE is the default)
    if occurrence.busy_state == BusyState::Free {
        event.add_property("TRANSP", "TRANSPARENT");
    }
    if occurrence.busy_state == BusyState::Tentative {
        event.add_property("STATUS", "TENTATIVE");
    }
    if let Some(status) = occurrence.busy_state.as_cdo_str() {
        event.add_property("X-MICROSOFT-CDO-BUSYSTATUS", status);
    }

    if let Some(tag) = occurrence.sync_tag() {
        event.add_property("CATEGORIES", tag.as_str());
    }

    if occurrence.reminders {
        let trigger = Trigger::before_start(chrono::Duration::minutes(REMINDER_MINUTES));
        event.alarm(Alarm::display("Reminder", trigger));
    }

    event.done()
}

fn add_time_property(event: &mut icalendar::Event, name: &str, time: DateTime<Utc>, all_day: bool) {
    if all_day {
        let date = time.with_timezone(&Local).date_naive();
        let mut prop = Property::new(name, date.format("%Y%m%d").to_string());
        prop.append_parameter(ValueType::Date);
        event.append_property(prop);
    } else {
        event.add_property(name, time.format("%Y%m%dT%H%M%SZ").to_string());
    }
}

fn fingerprint_uid(occurrence: &Occurrence) -> String {
    format!(
        "{}-{}@calsync",
        occurrence.start.format("%Y%m%dT%H%M%SZ"),
        occurrence.end.format("%Y%m%dT%H%M%SZ")
    )
}

const PRODID: &str = "-//calsync//busy mirror//EN";

/// Properties left out of the output, by enclosing component.
const OMITTED: &[(&str, &str)] = &[
    ("VCALENDAR", "CALSCALE"),
    ("VALARM", "DTSTAMP"),
    ("VALARM", "UID"),
];

/// Serialize a finished calendar with our PRODID and without the defaults
/// icalendar always writes.
fn serialize(cal: Calendar) -> String {
    let raw = cal.to_string();
    let mut components: Vec<&str> = Vec::new();
    let mut out = String::with_capacity(raw.len());

    for line in raw.lines() {
        let (head, value) = line.split_once(':').unwrap_or((line, ""));
        let name = head.split(';').next().unwrap_or(head);
        match name {
            "BEGIN" => components.push(value),
            "END" => {
                components.pop();
            }
            _ => {}
        }
        let inside = components.last().copied().unwrap_or_default();

        if OMITTED.contains(&(inside, name)) {
            continue;
        }
        if inside == "VCALENDAR" && name == "PRODID" {
            out.push_str("PRODID:");
            out.push_str(PRODID);
        } else {
            out.push_str(line);
        }
        out.push_str("\r\n");
    }

    out
}
