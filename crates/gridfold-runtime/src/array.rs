use std::cell::UnsafeCell;
use std::fmt::Debug;
use std::sync::Arc;

/// Element types that can live in a device array.
///
/// `Pod` gives plain-bytes copy semantics for the host/device mirror, the
/// rest lets workers move values across threads freely.
pub trait Element: bytemuck::Pod + Send + Sync + Debug + 'static {}

impl<T: bytemuck::Pod + Send + Sync + Debug + 'static> Element for T {}

/// Device-side storage for one array.
///
/// Interior-mutable so that many workers can write disjoint slots of the
/// same buffer during a launch. Soundness rests on the launch contract of
/// [`crate::DeviceClient`]: within one pass, each slot is written by at most
/// one worker per tree level, levels are separated by the group barrier, and
/// passes are separated by `synchronize`.
pub struct DeviceBuffer<T> {
    slots: UnsafeCell<Box<[T]>>,
}

// One writer per slot per level, see above.
unsafe impl<T: Element> Sync for DeviceBuffer<T> {}

impl<T: Element> DeviceBuffer<T> {
    fn from_slice(data: &[T]) -> Arc<Self> {
        Arc::new(Self {
            slots: UnsafeCell::new(data.to_vec().into_boxed_slice()),
        })
    }

    /// Number of elements in the buffer.
    pub fn len(&self) -> usize {
        unsafe { (&(*self.slots.get())).len() }
    }

    /// Whether the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the element at `index`.
    ///
    /// # Safety
    ///
    /// No worker may be writing `index` concurrently; callers rely on the
    /// level/pass ordering of the launch contract.
    pub unsafe fn load(&self, index: usize) -> T {
        (*self.slots.get())[index]
    }

    /// Writes the element at `index`.
    ///
    /// # Safety
    ///
    /// The caller must be the only worker touching `index` until the next
    /// barrier or pass boundary.
    pub unsafe fn store(&self, index: usize, value: T) {
        (*self.slots.get())[index] = value;
    }

    /// Copies the whole buffer out. Only meaningful once all launched work
    /// has been synchronized.
    pub(crate) fn snapshot(&self) -> Vec<T> {
        unsafe { (*self.slots.get()).to_vec() }
    }
}

/// Fixed-length, host-owned array mirrored to device memory.
///
/// Created and destroyed by application code; the engines only borrow it for
/// the duration of an operation and mutate the device side in place. The
/// host mirror is refreshed on [`DeviceArray::read`].
///
/// At most one operation may be in flight on an array at a time.
pub struct DeviceArray<T: Element> {
    host: Vec<T>,
    device: Arc<DeviceBuffer<T>>,
}

impl<T: Element> DeviceArray<T> {
    /// Allocates the array and copies `data` in (host to device).
    pub(crate) fn create(data: &[T]) -> Self {
        Self {
            host: data.to_vec(),
            device: DeviceBuffer::from_slice(data),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.host.len()
    }

    /// Whether the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.host.is_empty()
    }

    /// Device-side handle, for kernel bodies.
    pub fn buffer(&self) -> Arc<DeviceBuffer<T>> {
        Arc::clone(&self.device)
    }

    /// Copies the device contents back into the host mirror and returns it.
    ///
    /// The caller must have synchronized all launched work touching this
    /// array first.
    pub fn read(&mut self) -> &[T] {
        let snapshot = self.device.snapshot();
        self.host.copy_from_slice(&snapshot);
        &self.host
    }
}
