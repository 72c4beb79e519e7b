use std::sync::Arc;

use gridfold_runtime::{DeviceArray, DeviceBuffer, DeviceClient, Element, WorkerScope};

use crate::view::StridedView;
use crate::EngineError;

/// Combining functions accepted by the reduction engines.
///
/// Must be associative. Commutativity is not required: pairs are combined
/// bottom-up, left-biased, so for an associative `func` the result equals a
/// sequential left fold regardless of the partition. A non-associative
/// `func` still yields a deterministic result for a fixed length and group
/// size, but not the same one across group sizes.
pub trait CombineFn<T>: Fn(T, T) -> T + Send + Sync + 'static {}

impl<T, F: Fn(T, T) -> T + Send + Sync + 'static> CombineFn<T> for F {}

/// Folds every element of `array` into one value with `func`.
///
/// Runs barrier-synchronized tree passes until one representative is left,
/// then reads it back from slot 0. Slots past the surviving representatives
/// are left in an unspecified but initialized state.
///
/// A single-element array is returned as-is without invoking `func` or
/// launching anything; an empty array is [`EngineError::EmptyInput`].
pub fn reduce<T, F>(
    client: &DeviceClient,
    array: &mut DeviceArray<T>,
    func: F,
) -> Result<T, EngineError>
where
    T: Element,
    F: CombineFn<T>,
{
    match array.len() {
        0 => Err(EngineError::EmptyInput),
        1 => Ok(array.read()[0]),
        count => {
            let func = Arc::new(func);
            let values = array.buffer();
            let mut view = StridedView::dense(count);
            while view.len() > 1 {
                let partition = client.partition_for(view.len())?;
                let group_size = partition.group_size as usize;
                log::trace!(
                    "reduce pass: {} logical elements at stride {}, {} groups of {}",
                    view.len(),
                    view.stride(),
                    partition.group_count,
                    partition.group_size
                );
                let pass_view = view;
                let values = Arc::clone(&values);
                let func = Arc::clone(&func);
                client.launch(partition, move |scope| {
                    tree_pass(&values, func.as_ref(), scope, pass_view)
                });
                // Cross-group ordering only exists at pass boundaries; the
                // next pass readdresses slots other groups just wrote.
                client.synchronize()?;
                view = view.collapse(group_size);
            }
            Ok(array.read()[0])
        }
    }
}

/// One pass of the strided tree reduction, executed by every worker.
///
/// At level `step = 1 << exp`, the worker owning logical element `i`
/// combines it with its partner `i + step` when three guards hold: the
/// worker leads a pair at this level, the partner is within the group, and
/// the partner is a live logical element (`i + step < view.len()`; the
/// partner index itself must be in range, not merely adjacent to it).
fn tree_pass<T, F>(values: &DeviceBuffer<T>, func: &F, scope: &WorkerScope, view: StridedView)
where
    T: Element,
    F: Fn(T, T) -> T,
{
    let group_size = scope.group_size();
    let local = scope.local_id();
    let i = scope.global_id();
    let mut step = 1;
    while step < group_size {
        if local % (2 * step) == 0 && local + step < group_size && i + step < view.len() {
            let lo = view.physical(i);
            let hi = view.physical(i + step);
            // Sole writer of `lo` at this level; `hi` has no writer.
            unsafe { values.store(lo, func(values.load(lo), values.load(hi))) };
        }
        scope.sync_group();
        step <<= 1;
    }
}
