use gridfold_runtime::{DeviceArray, DeviceClient, Element};

use crate::EngineError;

/// Per-element transforms accepted by the map engine.
///
/// Must be pure: application order across indices is unspecified and each
/// index is touched by exactly one worker, so a transform reaching outside
/// its own slot races with its neighbours.
pub trait MapFn<T>: Fn(T) -> T + Send + Sync + 'static {}

impl<T, F: Fn(T) -> T + Send + Sync + 'static> MapFn<T> for F {}

/// Applies `func` to every element of `array`, in place.
///
/// An empty array is a no-op and launches nothing.
pub fn apply<T, F>(
    client: &DeviceClient,
    array: &mut DeviceArray<T>,
    func: F,
) -> Result<(), EngineError>
where
    T: Element,
    F: MapFn<T>,
{
    let count = array.len();
    if count == 0 {
        return Ok(());
    }
    let partition = client.partition_for(count)?;
    let values = array.buffer();
    client.launch(partition, move |scope| {
        let i = scope.global_id();
        if i < count {
            // Sole writer of slot i for this launch.
            unsafe { values.store(i, func(values.load(i))) };
        }
    });
    client.synchronize()?;
    Ok(())
}

/// Applies `func` to the elements of `array` whose flag is greater than
/// zero, in place.
///
/// `flags` must have the same length as `array`; a mismatch is reported
/// before anything is launched.
pub fn apply_flagged<T, F>(
    client: &DeviceClient,
    array: &mut DeviceArray<T>,
    flags: &DeviceArray<i32>,
    func: F,
) -> Result<(), EngineError>
where
    T: Element,
    F: MapFn<T>,
{
    let count = array.len();
    if flags.len() != count {
        return Err(EngineError::LengthMismatch {
            elements: count,
            flags: flags.len(),
        });
    }
    if count == 0 {
        return Ok(());
    }
    let partition = client.partition_for(count)?;
    let values = array.buffer();
    let gates = flags.buffer();
    client.launch(partition, move |scope| {
        let i = scope.global_id();
        if i < count {
            unsafe {
                if gates.load(i) > 0 {
                    values.store(i, func(values.load(i)));
                }
            }
        }
    });
    client.synchronize()?;
    Ok(())
}
