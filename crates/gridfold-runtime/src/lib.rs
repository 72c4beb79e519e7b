//! Worker-pool compute runtime for gridfold.
//!
//! Models a massively parallel device on host threads: arrays are mirrored
//! between a host-owned buffer and shared device storage, launches are split
//! into worker groups by a deterministic partition policy, and workers of a
//! group synchronize at an explicit barrier while groups only meet at pass
//! boundaries through [`DeviceClient::synchronize`].

mod array;
mod barrier;
mod client;
mod error;
mod partition;
mod scheduler;
mod scope;

pub use array::{DeviceArray, DeviceBuffer, Element};
pub use barrier::GroupBarrier;
pub use client::{DeviceClient, DeviceConfig};
pub use error::{ExecutionFault, PartitionError};
pub use partition::{partition_for, WorkerPartition};
pub use scope::WorkerScope;
