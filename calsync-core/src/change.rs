//! Change detection between the last sent snapshot and the current one.

use crate::fingerprint::fingerprint_set;
use crate::occurrence::Occurrence;

/// True when the two snapshots differ as sets of fingerprints.
///
/// Order is irrelevant and duplicates collapse. A first run passes an empty
/// `previous`, so any eligible event triggers a send.
pub fn has_changed(previous: &[Occurrence], current: &[Occurrence]) -> bool {
    fingerprint_set(previous) != fingerprint_set(current)
}
