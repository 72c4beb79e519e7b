//! Data-parallel map and reduction engines over device-mirrored arrays.
//!
//! The engines drive the worker-group runtime in `gridfold-runtime`:
//! [`apply`] and [`apply_flagged`] transform every (or every flagged)
//! element in one launch, while [`reduce`] and [`reduce_segmented`] fold
//! arrays through repeated barrier-synchronized tree passes, collapsing
//! one representative per worker group until a single pass covers what
//! is left.

pub mod error;
pub mod map;
pub mod reduce;
pub mod segmented;

mod view;

pub use error::EngineError;
pub use map::{apply, apply_flagged, MapFn};
pub use reduce::{reduce, CombineFn};
pub use segmented::reduce_segmented;
