//! Selection of the validator set that counts toward a day.

use std::collections::BTreeSet;

use crate::snapshot::SnapshotIndex;

/// Indices of validators that count toward the day spanning
/// `[start_epoch, end_epoch]`.
///
/// One predicate covers every exclusion: a validator is in iff it is present
/// in both boundary snapshots, its activation (as known at the start) is no
/// later than the day's first epoch, its exit (as known at the end) is after
/// the day's last epoch, and neither snapshot marks it slashed. Activation
/// is read from the start snapshot and exit from the end snapshot because
/// that is where each transition is authoritative: an exit scheduled during
/// the day only shows up in the closing state.
pub fn eligible_indices(
    start: &SnapshotIndex,
    end: &SnapshotIndex,
    start_epoch: u64,
    end_epoch: u64,
) -> BTreeSet<u64> {
    start
        .indices()
        .filter(|&index| {
            let Some(opening) = start.get(index) else {
                return false;
            };
            let Some(closing) = end.get(index) else {
                return false;
            };
            opening.activation_epoch <= start_epoch
                && closing.exit_epoch > end_epoch
                && !opening.is_slashed()
                && !closing.is_slashed()
        })
        .collect()
}
