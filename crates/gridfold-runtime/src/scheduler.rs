use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use crate::scope::PoisonExit;
use crate::{ExecutionFault, GroupBarrier, WorkerPartition, WorkerScope};

/// Kernel body invoked once per worker of a launch.
pub(crate) type GroupKernel = Arc<dyn Fn(&WorkerScope) + Send + Sync>;

/// Dispatches worker groups onto a fixed pool of runner threads.
///
/// Each launched group is one task; the runner that picks it up spawns the
/// group's workers as scoped threads sharing one [`GroupBarrier`]. Groups of
/// the same launch therefore run concurrently up to the pool width, while
/// workers inside a group really block on each other at level boundaries.
pub(crate) struct Scheduler {
    runners: Vec<Runner>,
    next_runner: usize,
    inflight: usize,
    done_tx: mpsc::Sender<Option<ExecutionFault>>,
    done_rx: mpsc::Receiver<Option<ExecutionFault>>,
}

impl Scheduler {
    pub fn new(pool_size: usize) -> Self {
        let runners = (0..pool_size.max(1)).map(Runner::new).collect();
        let (done_tx, done_rx) = mpsc::channel();
        Self {
            runners,
            next_runner: 0,
            inflight: 0,
            done_tx,
            done_rx,
        }
    }

    /// Queues every group of the partition; returns without waiting.
    pub fn dispatch(&mut self, partition: WorkerPartition, kernel: GroupKernel) {
        log::trace!(
            "dispatching {} groups of {} workers",
            partition.group_count,
            partition.group_size
        );
        for group_id in 0..partition.group_count {
            let task = GroupTask {
                kernel: Arc::clone(&kernel),
                group_id,
                partition,
                done: self.done_tx.clone(),
            };
            self.runners[self.next_runner].send(task);
            self.next_runner = (self.next_runner + 1) % self.runners.len();
            self.inflight += 1;
        }
    }

    /// Blocks until every queued group has completed, surfacing the first
    /// fault once the whole launch has drained.
    pub fn drain(&mut self) -> Result<(), ExecutionFault> {
        let mut first_fault = None;
        while self.inflight > 0 {
            let outcome = self
                .done_rx
                .recv()
                .expect("group runners disconnected while work was in flight");
            self.inflight -= 1;
            if first_fault.is_none() {
                first_fault = outcome;
            }
        }
        match first_fault {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }
}

struct Runner {
    tx: mpsc::Sender<GroupTask>,
}

impl Runner {
    fn new(runner_id: usize) -> Self {
        let (tx, rx) = mpsc::channel::<GroupTask>();
        thread::spawn(move || {
            log::trace!("group runner {runner_id} started");
            for task in rx.iter() {
                task.run();
            }
            log::trace!("group runner {runner_id} stopped");
        });
        Self { tx }
    }

    fn send(&self, task: GroupTask) {
        self.tx.send(task).expect("group runner thread is gone");
    }
}

struct GroupTask {
    kernel: GroupKernel,
    group_id: u32,
    partition: WorkerPartition,
    done: mpsc::Sender<Option<ExecutionFault>>,
}

impl GroupTask {
    fn run(self) {
        let group_size = self.partition.group_size;
        let barrier = GroupBarrier::new(group_size);
        let fault: Mutex<Option<ExecutionFault>> = Mutex::new(None);

        thread::scope(|scope| {
            for local_id in 0..group_size {
                let barrier = &barrier;
                let fault = &fault;
                let kernel = &self.kernel;
                scope.spawn(move || {
                    let worker = WorkerScope::new(self.group_id, local_id, self.partition, barrier);
                    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| kernel(&worker))) {
                        // Workers unwound by a sibling's poisoning are not
                        // faults of their own.
                        if payload.downcast_ref::<PoisonExit>().is_none() {
                            let mut slot = fault.lock().unwrap();
                            if slot.is_none() {
                                *slot = Some(ExecutionFault::WorkerPanic {
                                    group_id: self.group_id,
                                    local_id,
                                    reason: panic_reason(payload.as_ref()),
                                });
                            }
                            drop(slot);
                            barrier.poison();
                        }
                    }
                });
            }
        });

        // The launch may already have been abandoned; a closed channel only
        // means nobody is waiting for the outcome anymore.
        let _ = self.done.send(fault.into_inner().unwrap());
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
