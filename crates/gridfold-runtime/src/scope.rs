use crate::{GroupBarrier, WorkerPartition};

/// Sentinel panic payload used to unwind a worker whose group barrier was
/// poisoned by a sibling's fault. Filtered out by the group runner so only
/// the original fault is reported.
pub(crate) struct PoisonExit;

/// Per-worker execution context handed to a kernel body.
///
/// Identifies the worker within the launch and gives access to the
/// intra-group barrier. There is deliberately no cross-group primitive here:
/// ordering between groups exists only at pass boundaries, once
/// `synchronize` has drained the whole launch.
pub struct WorkerScope<'a> {
    group_id: u32,
    local_id: u32,
    partition: WorkerPartition,
    barrier: &'a GroupBarrier,
}

impl<'a> WorkerScope<'a> {
    pub(crate) fn new(
        group_id: u32,
        local_id: u32,
        partition: WorkerPartition,
        barrier: &'a GroupBarrier,
    ) -> Self {
        Self {
            group_id,
            local_id,
            partition,
            barrier,
        }
    }

    /// Index of this worker's group within the launch.
    pub fn group_id(&self) -> usize {
        self.group_id as usize
    }

    /// Position of this worker within its group.
    pub fn local_id(&self) -> usize {
        self.local_id as usize
    }

    /// Number of workers in each group of this launch.
    pub fn group_size(&self) -> usize {
        self.partition.group_size as usize
    }

    /// Position of this worker across the whole launch.
    pub fn global_id(&self) -> usize {
        self.group_id() * self.group_size() + self.local_id()
    }

    /// Level boundary: blocks until every worker of the group arrives.
    ///
    /// Writes made before the boundary are visible to the whole group after
    /// it. Every worker of the group must reach every `sync_group` call of a
    /// kernel body.
    pub fn sync_group(&self) {
        if !self.barrier.wait() {
            std::panic::panic_any(PoisonExit);
        }
    }
}
