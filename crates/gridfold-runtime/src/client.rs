use std::sync::{Arc, Mutex};
use std::thread;

use serde::{Deserialize, Serialize};

use crate::scheduler::Scheduler;
use crate::{
    partition, DeviceArray, Element, ExecutionFault, PartitionError, WorkerPartition, WorkerScope,
};

const DEFAULT_MAX_GROUP_SIZE: u32 = 64;

/// Tunables for a [`DeviceClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Hard cap on workers per group; must be a power of two of at least 2.
    /// The tree reduction relies on power-of-two offsets within a group.
    pub max_group_size: u32,
    /// Width of the group-runner pool. `None` uses the available parallelism
    /// of the host.
    pub pool_size: Option<usize>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            max_group_size: DEFAULT_MAX_GROUP_SIZE,
            pool_size: None,
        }
    }
}

impl DeviceConfig {
    fn validate(self) -> Result<Self, PartitionError> {
        if !self.max_group_size.is_power_of_two() || self.max_group_size < 2 {
            return Err(PartitionError::InvalidGroupSize(self.max_group_size));
        }
        Ok(self)
    }
}

/// Entry point to the worker-pool device.
///
/// Owns the runner pool and hands out device arrays. A launch is
/// fire-and-forget; faults and completion are observed through
/// [`DeviceClient::synchronize`], which must separate dependent passes;
/// there is no synchronization primitive spanning groups within a launch.
pub struct DeviceClient {
    scheduler: Mutex<Scheduler>,
    config: DeviceConfig,
}

impl DeviceClient {
    /// Builds a client after validating the configuration.
    pub fn new(config: DeviceConfig) -> Result<Self, PartitionError> {
        let config = config.validate()?;
        let pool_size = config
            .pool_size
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, |n| n.get()));
        log::debug!(
            "device client: max group size {}, pool of {pool_size} runners",
            config.max_group_size
        );
        Ok(Self {
            scheduler: Mutex::new(Scheduler::new(pool_size)),
            config,
        })
    }

    /// Allocates a device array and copies `data` in.
    pub fn create<T: Element>(&self, data: &[T]) -> DeviceArray<T> {
        DeviceArray::create(data)
    }

    /// Partition sized for `count` elements under this client's group cap.
    pub fn partition_for(&self, count: usize) -> Result<WorkerPartition, PartitionError> {
        partition::partition_for(count, self.config.max_group_size)
    }

    /// Queues `kernel` to run once per worker of `partition` and returns
    /// immediately. Ordering against other launches is only established by
    /// [`DeviceClient::synchronize`].
    pub fn launch<K>(&self, partition: WorkerPartition, kernel: K)
    where
        K: Fn(&WorkerScope) + Send + Sync + 'static,
    {
        let mut scheduler = self.scheduler.lock().unwrap();
        scheduler.dispatch(partition, Arc::new(kernel));
    }

    /// Blocks until every launched group has completed and surfaces the
    /// first execution fault, if any. A fault aborts the in-flight operation;
    /// retrying it is unsafe because the touched arrays are left undefined.
    pub fn synchronize(&self) -> Result<(), ExecutionFault> {
        let mut scheduler = self.scheduler.lock().unwrap();
        scheduler.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(max_group_size: u32) -> DeviceClient {
        DeviceClient::new(DeviceConfig {
            max_group_size,
            pool_size: Some(2),
        })
        .unwrap()
    }

    #[test]
    fn launch_runs_every_worker_once() {
        let client = client(4);
        let mut array = client.create(&[0u32; 10]);
        let buffer = array.buffer();
        let n = array.len();

        let partition = client.partition_for(n).unwrap();
        client.launch(partition, move |scope| {
            let i = scope.global_id();
            if i < n {
                unsafe { buffer.store(i, i as u32 + 1) };
            }
        });
        client.synchronize().unwrap();

        assert_eq!(array.read(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn worker_panic_surfaces_as_fault() {
        let client = client(4);
        let partition = client.partition_for(8).unwrap();
        client.launch(partition, |scope| {
            if scope.global_id() == 3 {
                panic!("boom");
            }
            scope.sync_group();
        });
        let fault = client.synchronize().unwrap_err();
        let ExecutionFault::WorkerPanic { reason, .. } = fault;
        assert!(reason.contains("boom"));
    }

    #[test]
    fn invalid_group_cap_is_rejected_at_construction() {
        let result = DeviceClient::new(DeviceConfig {
            max_group_size: 24,
            pool_size: None,
        });
        assert!(matches!(result, Err(PartitionError::InvalidGroupSize(24))));
    }

    #[test]
    fn barrier_orders_levels_within_a_group() {
        let client = client(8);
        let mut array = client.create(&[1u64; 8]);
        let buffer = array.buffer();

        // One group; pairwise tree sum with a barrier between levels.
        let partition = client.partition_for(8).unwrap();
        client.launch(partition, move |scope| {
            let local = scope.local_id();
            let mut step = 1;
            while step < scope.group_size() {
                if local % (2 * step) == 0 {
                    unsafe {
                        let merged = buffer.load(local) + buffer.load(local + step);
                        buffer.store(local, merged);
                    }
                }
                scope.sync_group();
                step *= 2;
            }
        });
        client.synchronize().unwrap();
        assert_eq!(array.read()[0], 8);
    }
}
