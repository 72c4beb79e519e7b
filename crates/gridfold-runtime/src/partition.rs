use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::PartitionError;

/// How one launch is split into worker groups.
///
/// The partition always covers the requested element count:
/// `group_count * group_size >= n`. Group sizes are powers of two because the
/// tree reduction pairs elements at power-of-two offsets within a group.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerPartition {
    /// Number of worker groups to launch.
    pub group_count: u32,
    /// Number of workers per group.
    pub group_size: u32,
}

impl WorkerPartition {
    /// Total number of workers across all groups.
    pub fn total_workers(&self) -> u64 {
        self.group_count as u64 * self.group_size as u64
    }
}

/// Deterministic partition policy.
///
/// The group size is the smallest power of two covering `count`, capped by
/// `max_group_size`; the group count covers the remainder. Recomputed by the
/// engines for every pass, since the problem shrinks as it collapses.
pub fn partition_for(count: usize, max_group_size: u32) -> Result<WorkerPartition, PartitionError> {
    if !max_group_size.is_power_of_two() || max_group_size < 2 {
        return Err(PartitionError::InvalidGroupSize(max_group_size));
    }
    let count = count.max(1);
    let group_size = count
        .checked_next_power_of_two()
        .unwrap_or(max_group_size as usize)
        .min(max_group_size as usize);
    let group_count = count.div_ceil(group_size);
    if group_count > u32::MAX as usize {
        return Err(PartitionError::TooManyElements {
            count,
            max: u32::MAX,
        });
    }
    Ok(WorkerPartition::new(group_count as u32, group_size as u32))
}
