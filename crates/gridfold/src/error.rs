use gridfold_runtime::{ExecutionFault, PartitionError};
use thiserror::Error;

/// Errors surfaced by the map and reduction engines.
///
/// Contract violations are checked eagerly, before anything is launched.
/// One caller obligation cannot be checked at runtime: the combining
/// function of a reduction must be associative, otherwise the result is
/// deterministic for a fixed partition but differs across group sizes.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A flag or count array was paired with an element array of a
    /// different length.
    #[error("flag/count array holds {flags} elements but the element array holds {elements}")]
    LengthMismatch {
        /// Length of the element array.
        elements: usize,
        /// Length of the flag/count array.
        flags: usize,
    },

    /// Reducing an empty array has no defined result; nothing is launched.
    #[error("cannot reduce an empty array")]
    EmptyInput,

    /// The partition policy could not size a pass.
    #[error(transparent)]
    Partition(#[from] PartitionError),

    /// The runtime reported a fault while executing a pass. The operation
    /// is aborted and must not be retried.
    #[error(transparent)]
    Execution(#[from] ExecutionFault),
}
