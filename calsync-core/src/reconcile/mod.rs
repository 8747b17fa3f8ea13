//! Full-replace reconciliation of the local mirror against a remote snapshot.
//!
//! Every inbound message restates the sender's busy time for the whole
//! window. The latest snapshot is therefore authoritative: whatever the
//! local mirror holds that the snapshot does not reaffirm is purged, and
//! whatever the snapshot holds that the mirror lacks is created. A sender
//! that only mailed new events would cause every omitted event to be
//! deleted here.

mod change;

pub use change::{Change, ChangeKind};

use std::collections::BTreeSet;

use serde::Serialize;

use crate::fingerprint::{Fingerprint, fingerprint_set};
use crate::occurrence::Occurrence;

/// Additions and removals that bring the local mirror in line with the
/// remote snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Reconciliation {
    /// New system-owned occurrences to create, one per missing fingerprint.
    pub to_add: Vec<Occurrence>,
    /// Local system-owned occurrences to delete.
    pub to_remove: Vec<Occurrence>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// All planned changes, removals first, each group in start order.
    pub fn changes(&self) -> impl Iterator<Item = Change<'_>> {
        let removes = self.to_remove.iter().map(|occurrence| Change {
            kind: ChangeKind::Remove,
            occurrence,
        });
        let adds = self.to_add.iter().map(|occurrence| Change {
            kind: ChangeKind::Add,
            occurrence,
        });
        removes.chain(adds)
    }
}

/// Compute `remote - local_synced` and `local_synced - remote` under
/// fingerprint equality.
///
/// `local_synced` must hold only the tagged occurrences inside the window;
/// the caller is responsible for that selection. An empty `remote` is a
/// legitimate "nothing busy" restatement and removes every local entry.
///
/// Remote entries with no extent are ignored: no mirror is created for them
/// and none is kept.
pub fn reconcile(remote: &[Occurrence], local_synced: &[Occurrence]) -> Reconciliation {
    let remote: Vec<&Occurrence> = remote
        .iter()
        .filter(|o| {
            let keep = o.has_extent();
            if !keep {
                tracing::warn!(start = %o.start, end = %o.end, "ignoring remote block without extent");
            }
            keep
        })
        .collect();
    let local_keys = fingerprint_set(local_synced);
    let remote_keys = fingerprint_set(remote.iter().copied());

    let mut seen: BTreeSet<Fingerprint> = BTreeSet::new();
    let mut to_add: Vec<Occurrence> = remote
        .iter()
        .filter(|o| !local_keys.contains(&o.fingerprint()))
        .filter(|o| seen.insert(o.fingerprint()))
        .map(|o| o.to_synced())
        .collect();

    let mut to_remove: Vec<Occurrence> = local_synced
        .iter()
        .filter(|o| !remote_keys.contains(&o.fingerprint()))
        .cloned()
        .collect();

    to_add.sort_by_key(Occurrence::fingerprint);
    to_remove.sort_by_key(Occurrence::fingerprint);

    Reconciliation { to_add, to_remove }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occurrence::BusyState;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 20, hour, 0, 0).unwrap()
    }

    fn remote(start: u32, end: u32) -> Occurrence {
        Occurrence::new(at(start), at(end), "Busy")
    }

    fn local(start: u32, end: u32) -> Occurrence {
        Occurrence::synced(at(start), at(end)).with_id(format!("local-{start}-{end}"))
    }

    fn keys(items: &[Occurrence]) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        items.iter().map(|o| (o.start, o.end)).collect()
    }

    #[test]
    fn new_remote_block_is_added() {
        let plan = reconcile(&[remote(9, 10)], &[]);
        assert_eq!(keys(&plan.to_add), vec![(at(9), at(10))]);
        assert!(plan.to_remove.is_empty());
    }

    #[test]
    fn empty_remote_purges_the_mirror() {
        let plan = reconcile(&[], &[local(9, 10)]);
        assert!(plan.to_add.is_empty());
        assert_eq!(keys(&plan.to_remove), vec![(at(9), at(10))]);
    }

    #[test]
    fn only_the_missing_block_is_added() {
        let plan = reconcile(&[remote(9, 10), remote(14, 15)], &[local(9, 10)]);
        assert_eq!(keys(&plan.to_add), vec![(at(14), at(15))]);
        assert!(plan.to_remove.is_empty());
    }

    #[test]
    fn reconciling_a_snapshot_with_itself_is_a_no_op() {
        let snapshot = vec![local(9, 10), local(11, 12), local(14, 15)];
        let plan = reconcile(&snapshot, &snapshot);
        assert!(plan.is_empty());
    }

    #[test]
    fn moved_event_is_remove_plus_add() {
        let plan = reconcile(&[remote(10, 11)], &[local(9, 10)]);
        assert_eq!(keys(&plan.to_add), vec![(at(10), at(11))]);
        assert_eq!(keys(&plan.to_remove), vec![(at(9), at(10))]);
    }

    #[test]
    fn additions_are_tagged_anonymous_mirrors() {
        let incoming = Occurrence::new(at(9), at(10), "Private")
            .with_busy_state(BusyState::Tentative)
            .with_reminders(true);
        let plan = reconcile(&[incoming], &[]);
        let added = &plan.to_add[0];
        assert!(added.is_tagged());
        assert_eq!(added.summary, "Busy");
        assert!(!added.reminders);
        assert_eq!(added.busy_state, BusyState::Tentative);
    }

    #[test]
    fn remote_duplicates_add_a_single_copy() {
        let plan = reconcile(&[remote(9, 10), remote(9, 10)], &[]);
        assert_eq!(plan.to_add.len(), 1);
    }

    #[test]
    fn matched_local_duplicates_are_kept() {
        let plan = reconcile(&[remote(9, 10)], &[local(9, 10), local(9, 10)]);
        assert!(plan.is_empty());
    }

    #[test]
    fn unmatched_local_duplicates_are_all_removed() {
        let plan = reconcile(&[], &[local(9, 10), local(9, 10)]);
        assert_eq!(plan.to_remove.len(), 2);
    }

    #[test]
    fn zero_width_remote_block_is_not_added() {
        let plan = reconcile(&[remote(9, 9), remote(11, 12)], &[]);
        assert_eq!(keys(&plan.to_add), vec![(at(11), at(12))]);
        assert!(plan.to_add.iter().all(Occurrence::has_extent));
    }

    #[test]
    fn zero_width_remote_block_does_not_keep_a_stale_mirror() {
        let plan = reconcile(&[remote(9, 9)], &[local(9, 9)]);
        assert!(plan.to_add.is_empty());
        assert_eq!(keys(&plan.to_remove), vec![(at(9), at(9))]);
    }

    #[test]
    fn partition_is_complete() {
        let remote_set = vec![remote(8, 9), remote(9, 10), remote(13, 14), remote(16, 17)];
        let local_set = vec![local(9, 10), local(11, 12), local(16, 17), local(18, 19)];
        let plan = reconcile(&remote_set, &local_set);

        let local_keys = fingerprint_set(&local_set);
        let remote_keys = fingerprint_set(&remote_set);
        let add_keys = fingerprint_set(&plan.to_add);
        let remove_keys = fingerprint_set(&plan.to_remove);

        for r in &remote_set {
            let in_both = local_keys.contains(&r.fingerprint());
            let added = add_keys.contains(&r.fingerprint());
            assert!(in_both ^ added, "remote {r} must be matched xor added");
        }
        for l in &local_set {
            let in_both = remote_keys.contains(&l.fingerprint());
            let removed = remove_keys.contains(&l.fingerprint());
            assert!(in_both ^ removed, "local {l} must be matched xor removed");
        }
    }

    #[test]
    fn removals_carry_the_sync_tag() {
        let local_set = vec![local(9, 10), local(11, 12)];
        let plan = reconcile(&[remote(11, 12)], &local_set);
        assert!(!plan.to_remove.is_empty());
        assert!(plan.to_remove.iter().all(Occurrence::is_tagged));
    }

    #[test]
    fn changes_list_removals_before_additions() {
        let plan = reconcile(&[remote(14, 15), remote(10, 11)], &[local(9, 10)]);
        let rendered: Vec<String> = plan.changes().map(|c| c.kind.to_string()).collect();
        assert_eq!(rendered, vec!["-", "+", "+"]);
        let first_add = plan.changes().nth(1).unwrap();
        assert_eq!(first_add.occurrence.start, at(10));
    }
}
