//! Payment queue ordering.

use super::record::ProviderRecord;
use super::registry::Registry;
use shared_types::Height;
use std::cmp::Ordering;

/// Height a provider queues from: the later of its last payment and its
/// revival, or its registration height if it was never paid.
fn payment_queue_height(record: &ProviderRecord) -> Height {
    let state = &record.state;
    let mut height = state.last_paid_height;
    if state.pose_revived_height != -1 && state.pose_revived_height > height {
        height = state.pose_revived_height;
    } else if height == 0 {
        height = state.registered_height;
    }
    height
}

fn compare_by_last_paid(a: &ProviderRecord, b: &ProviderRecord) -> Ordering {
    payment_queue_height(a)
        .cmp(&payment_queue_height(b))
        .then_with(|| a.internal_id.cmp(&b.internal_id))
}

impl Registry {
    /// The valid provider due for the next payment.
    pub fn payee(&self) -> Option<&ProviderRecord> {
        self.iter_valid().min_by(|a, b| compare_by_last_paid(a, b))
    }

    /// The next `count` payees, assuming nothing changes.
    ///
    /// Each pick is treated as paid at the next height, which sends it to
    /// the back of the queue, so the projection is the queue order itself.
    /// Future bans and registrations are not modelled: this is an
    /// approximation, not the authoritative order.
    pub fn projected_payees(&self, count: usize) -> Vec<ProviderRecord> {
        let mut queue: Vec<&ProviderRecord> = self.iter_valid().collect();
        let count = count.min(queue.len());
        queue.sort_by(|a, b| compare_by_last_paid(a, b));
        queue.into_iter().take(count).cloned().collect()
    }
}
