use thiserror::Error;

/// Errors raised while sizing a launch.
///
/// The partition policy recomputes a fresh partition for every pass, so these
/// should not occur in normal operation; they exist so an impossible request
/// fails loudly instead of wrapping around.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    /// More elements than a single partition pass can address.
    #[error("{count} elements exceed what one pass can address ({max} worker groups)")]
    TooManyElements {
        /// Requested element count.
        count: usize,
        /// Maximum addressable group count.
        max: u32,
    },

    /// The configured maximum group size cannot host the tree algorithm.
    #[error("max group size {0} is invalid, expected a power of two of at least 2")]
    InvalidGroupSize(u32),
}

/// Fault reported by the compute pool while running launched work.
///
/// Execution faults are fatal for the in-flight operation: the affected
/// arrays are left in an undefined state and the operation must not be
/// retried.
#[derive(Error, Debug, Clone)]
pub enum ExecutionFault {
    /// A worker panicked inside a kernel body.
    #[error("worker {local_id} of group {group_id} faulted\nCaused by:\n  {reason}")]
    WorkerPanic {
        /// Group the faulted worker belonged to.
        group_id: u32,
        /// Position of the worker within its group.
        local_id: u32,
        /// Panic payload, stringified.
        reason: String,
    },
}
