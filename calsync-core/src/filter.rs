//! Outbound filtering: which local occurrences may be shared, and in what form.

use crate::occurrence::{BusyState, Occurrence, PLACEHOLDER_SUMMARY};

/// Whether an occurrence may leave the local calendar.
///
/// All-day entries, free time and entries that already carry the placeholder
/// summary (mirrors of the remote calendar) stay home. So do instantaneous
/// entries, which block nothing.
pub fn is_exportable(occurrence: &Occurrence) -> bool {
    occurrence.has_extent()
        && !occurrence.is_all_day
        && occurrence.busy_state != BusyState::Free
        && occurrence.summary != PLACEHOLDER_SUMMARY
}

/// Select the exportable occurrences and anonymize them.
pub fn filter_outbound(occurrences: &[Occurrence]) -> Vec<Occurrence> {
    occurrences
        .iter()
        .filter(|o| is_exportable(o))
        .map(Occurrence::anonymized)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 20, hour, 0, 0).unwrap()
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(filter_outbound(&[]).is_empty());
    }

    #[test]
    fn busy_survives_and_free_does_not() {
        let input = vec![
            Occurrence::new(at(9), at(10), "Board meeting"),
            Occurrence::new(at(11), at(12), "Lunch").with_busy_state(BusyState::Free),
        ];
        let out = filter_outbound(&input);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].start, at(9));
        assert_eq!(out[0].summary, PLACEHOLDER_SUMMARY);
    }

    #[test]
    fn all_day_and_already_synced_entries_are_dropped() {
        let input = vec![
            Occurrence::new(at(0), at(23), "Holiday").with_all_day(true),
            Occurrence::synced(at(13), at(14)),
            Occurrence::new(at(15), at(16), "Busy"),
        ];
        assert!(filter_outbound(&input).is_empty());
    }

    #[test]
    fn instantaneous_entries_are_dropped() {
        let input = vec![
            Occurrence::new(at(9), at(9), "Call Bob"),
            Occurrence::new(at(11), at(12), "Review"),
        ];
        let out = filter_outbound(&input);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].start, at(11));
    }

    #[test]
    fn other_fields_are_preserved() {
        let input = vec![
            Occurrence::new(at(9), at(10), "Offsite")
                .with_busy_state(BusyState::OutOfOffice)
                .with_reminders(true)
                .with_id("abc"),
        ];
        let out = filter_outbound(&input);
        assert_eq!(out[0].busy_state, BusyState::OutOfOffice);
        assert!(out[0].reminders);
        assert_eq!(out[0].id.as_deref(), Some("abc"));
        assert_eq!(out[0].end, at(10));
    }

    #[test]
    fn survival_matches_the_three_rules() {
        let states = [
            BusyState::Free,
            BusyState::Busy,
            BusyState::Tentative,
            BusyState::OutOfOffice,
            BusyState::Unknown,
        ];
        for state in states {
            for all_day in [false, true] {
                for summary in ["Busy", "Planning"] {
                    let occ = Occurrence::new(at(9), at(10), summary)
                        .with_busy_state(state)
                        .with_all_day(all_day);
                    let expected = !all_day && state != BusyState::Free && summary != "Busy";
                    assert_eq!(
                        filter_outbound(std::slice::from_ref(&occ)).len() == 1,
                        expected,
                        "state={state:?} all_day={all_day} summary={summary}"
                    );
                }
            }
        }
    }
}
