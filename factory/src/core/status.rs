//! Batch status derivation

use shared::{BatchStatus, ItemStatus};

/// Derive a batch's aggregate status from its items' current states.
///
/// Never cached: callers recompute on every read so a completion flip is
/// visible immediately.
pub fn derive_batch_status(items: &[ItemStatus]) -> BatchStatus {
    if items.is_empty() {
        return BatchStatus::Empty;
    }

    let done = items.iter().filter(|s| **s == ItemStatus::Done).count();
    if done == 0 {
        BatchStatus::Pending
    } else if done == items.len() {
        BatchStatus::Completed
    } else {
        BatchStatus::InProgress
    }
}
