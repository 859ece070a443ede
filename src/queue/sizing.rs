//! Batch width selection.

use crate::provider::domain::ProviderFamily;

/// Chooses a batch width for `task_count` tasks aimed at `family`.
///
/// The width never exceeds the family's maximum and is halved for queues
/// longer than the family's burst threshold, trading latency for headroom
/// under per-minute limits. The result is at least one.
#[must_use]
pub fn batch_size_for(task_count: usize, family: ProviderFamily) -> usize {
    let max_width = family.max_batch_width();
    let width = if task_count > family.burst_threshold() {
        max_width.checked_div(2).unwrap_or(max_width).max(1)
    } else {
        max_width
    };
    task_count.min(width).max(1)
}
