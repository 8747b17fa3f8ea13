//! When two occurrences count as the same event.
//!
//! Identity is the `(start, end)` pair and nothing else. Summary, busy
//! state, all-day flag, origin and store id are ignored, so two blocks with
//! identical times collapse into one and moving an event by a minute reads
//! as a removal plus an addition.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::occurrence::Occurrence;

/// Hashable identity key of an occurrence. Orders by start, then end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Fingerprint {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Fingerprint {
    pub fn of(occurrence: &Occurrence) -> Self {
        Fingerprint {
            start: occurrence.start,
            end: occurrence.end,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

pub fn same_event(a: &Occurrence, b: &Occurrence) -> bool {
    Fingerprint::of(a) == Fingerprint::of(b)
}

/// Distinct fingerprints of a collection, duplicates collapsed.
pub fn fingerprint_set<'a, I>(occurrences: I) -> BTreeSet<Fingerprint>
where
    I: IntoIterator<Item = &'a Occurrence>,
{
    occurrences.into_iter().map(Fingerprint::of).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occurrence::BusyState;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 20, hour, minute, 0).unwrap()
    }

    #[test]
    fn only_times_take_part_in_identity() {
        let a = Occurrence::new(at(9, 0), at(10, 0), "Standup").with_busy_state(BusyState::Tentative);
        let b = Occurrence::synced(at(9, 0), at(10, 0)).with_all_day(true);
        assert!(same_event(&a, &b));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn a_minute_is_a_different_event() {
        let a = Occurrence::new(at(9, 0), at(10, 0), "Standup");
        let b = Occurrence::new(at(9, 1), at(10, 0), "Standup");
        let c = Occurrence::new(at(9, 0), at(10, 1), "Standup");
        assert!(!same_event(&a, &b));
        assert!(!same_event(&a, &c));
    }

    #[test]
    fn summary_only_differences_collapse() {
        let items = [
            Occurrence::new(at(9, 0), at(10, 0), "One"),
            Occurrence::new(at(9, 0), at(10, 0), "Two"),
            Occurrence::new(at(14, 0), at(15, 0), "Three"),
        ];
        let set = fingerprint_set(&items);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn fingerprints_order_by_start_then_end() {
        let early_short = Occurrence::new(at(9, 0), at(9, 30), "").fingerprint();
        let early_long = Occurrence::new(at(9, 0), at(11, 0), "").fingerprint();
        let late = Occurrence::new(at(10, 0), at(10, 30), "").fingerprint();
        assert!(early_short < early_long);
        assert!(early_long < late);
    }
}
