use std::sync::Arc;

use gridfold_runtime::{DeviceArray, DeviceBuffer, DeviceClient, Element, WorkerScope};

use crate::reduce::CombineFn;
use crate::view::StridedView;
use crate::EngineError;

/// Count value marking a slot that holds a finished segment total.
const SEGMENT_DONE: i32 = -1;

/// Folds each segment of `array` into one value with `func`, where segment
/// boundaries are carried by `counts` instead of being known to the host:
/// `counts[i] > 0` means slot `i`'s segment is still open, `counts[i] == 0`
/// means slot `i` closes its segment.
///
/// Same pass/stride scaffolding as [`crate::reduce`], with the merge rule at
/// each tree site gated by the counts, which are consolidated as the array
/// collapses. Finished totals are parked in slots freed by the collapse and
/// collected after the last pass; the returned totals are in no particular
/// order and the surviving index layout of both arrays is unspecified.
///
/// An all-open `counts` degenerates to a plain reduction (one total). With
/// every count zero, each element closes its own segment and is returned
/// as its own total.
///
/// `counts` must have the same length as `array` (checked before any
/// launch); an empty array is [`EngineError::EmptyInput`].
pub fn reduce_segmented<T, F>(
    client: &DeviceClient,
    array: &mut DeviceArray<T>,
    counts: &mut DeviceArray<i32>,
    func: F,
) -> Result<Vec<T>, EngineError>
where
    T: Element,
    F: CombineFn<T>,
{
    let total_len = array.len();
    if counts.len() != total_len {
        return Err(EngineError::LengthMismatch {
            elements: total_len,
            flags: counts.len(),
        });
    }
    if total_len == 0 {
        return Err(EngineError::EmptyInput);
    }

    if total_len > 1 {
        let func = Arc::new(func);
        let values = array.buffer();
        let opens = counts.buffer();
        let mut view = StridedView::dense(total_len);
        while view.len() > 1 {
            let partition = client.partition_for(view.len())?;
            let group_size = partition.group_size as usize;
            log::trace!(
                "segmented pass: {} logical elements at stride {}, {} groups of {}",
                view.len(),
                view.stride(),
                partition.group_count,
                partition.group_size
            );
            let pass_view = view;
            let values = Arc::clone(&values);
            let opens = Arc::clone(&opens);
            let func = Arc::clone(&func);
            client.launch(partition, move |scope| {
                segmented_tree_pass(&values, &opens, func.as_ref(), scope, pass_view, total_len)
            });
            client.synchronize()?;
            view = view.collapse(group_size);
        }
    }

    let consolidated = counts.read().to_vec();
    let collapsed = array.read();

    // Slot 0 holds either the whole-array run (no boundary anywhere) or the
    // leading piece, closed on the left by the array start. Parked totals
    // are marked; a still-open trailing run ends at the last slot, closed on
    // the right by the array end.
    let mut totals = vec![collapsed[0]];
    for index in 1..total_len {
        if consolidated[index] == SEGMENT_DONE {
            totals.push(collapsed[index]);
        }
    }
    if total_len > 1 && consolidated[0] == 0 && consolidated[total_len - 1] > 0 {
        totals.push(collapsed[total_len - 1]);
    }
    Ok(totals)
}

/// One pass of the segmented tree reduction.
///
/// Same level loop and guards as the plain pass; the work at each site is
/// the gated merge of two adjacent blocks.
fn segmented_tree_pass<T, F>(
    values: &DeviceBuffer<T>,
    opens: &DeviceBuffer<i32>,
    func: &F,
    scope: &WorkerScope,
    view: StridedView,
    total_len: usize,
) where
    T: Element,
    F: Fn(T, T) -> T,
{
    let group_size = scope.group_size();
    let local = scope.local_id();
    let i = scope.global_id();
    let mut step = 1;
    while step < group_size {
        if local % (2 * step) == 0 && local + step < group_size && i + step < view.len() {
            // Sole writer of the merged block's slots at this level.
            unsafe { merge_blocks(values, opens, func, i, step, view, total_len) };
        }
        scope.sync_group();
        step <<= 1;
    }
}

/// Merges the block led by logical element `i` with its right neighbour.
///
/// Block state, maintained across levels and passes:
/// - A block without a boundary is a single open run, held at its leading
///   slot with a positive count (the consolidated open markers of the run).
/// - A block with a boundary keeps its closed leading piece at the leading
///   slot with count 0; its trailing open run, if any, sits at the block's
///   physically last slot. Totals finished inside the block are parked in
///   freed slots and marked [`SEGMENT_DONE`].
///
/// The merge follows the gate of the right block's state: an open right
/// lead extends the left trailing run (values combined, counts summed); a
/// closed right lead either closes that run into a finished total or, when
/// the left block ends exactly on a boundary, is itself a finished total.
/// A closed left slot never swallows an open partner's value: the open
/// run is moved, not lost, when the block collapses.
///
/// # Safety
///
/// Caller must be the only worker touching the merged block's slots until
/// the next level boundary.
unsafe fn merge_blocks<T, F>(
    values: &DeviceBuffer<T>,
    opens: &DeviceBuffer<i32>,
    func: &F,
    i: usize,
    step: usize,
    view: StridedView,
    total_len: usize,
) where
    T: Element,
    F: Fn(T, T) -> T,
{
    let right = i + step;
    let right_end = usize::min(right + step, view.len());
    let lead = view.physical(i);
    let right_lead = view.physical(right);
    // Physically last slots of the left block and of the merged block.
    let left_trail = view.physical(right) - 1;
    let merged_trail = usize::min(view.physical(right_end), total_len) - 1;

    let lead_open = opens.load(lead) > 0;
    let (run_value, run_count) = if lead_open {
        (values.load(lead), opens.load(lead))
    } else if opens.load(left_trail) > 0 {
        (values.load(left_trail), opens.load(left_trail))
    } else {
        // The left block ends exactly on a segment boundary.
        if opens.load(right_lead) > 0 {
            // The right block's run becomes the merged block's trailing run.
            if merged_trail != right_lead {
                values.store(merged_trail, values.load(right_lead));
                opens.store(merged_trail, opens.load(right_lead));
            }
        } else {
            // The right leading piece is closed on both sides: finished.
            opens.store(right_lead, SEGMENT_DONE);
        }
        return;
    };

    if opens.load(right_lead) > 0 {
        // The run continues across the whole right block.
        let merged = func(run_value, values.load(right_lead));
        let consolidated = run_count + opens.load(right_lead);
        if lead_open {
            values.store(lead, merged);
            opens.store(lead, consolidated);
        } else {
            values.store(merged_trail, merged);
            opens.store(merged_trail, consolidated);
        }
    } else {
        // The right leading piece closes the run.
        let total = func(run_value, values.load(right_lead));
        if lead_open {
            // Becomes the merged block's closed leading piece.
            values.store(lead, total);
            opens.store(lead, 0);
        } else {
            values.store(left_trail, total);
            opens.store(left_trail, SEGMENT_DONE);
        }
    }
}
