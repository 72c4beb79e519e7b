use std::sync::{Condvar, Mutex};

/// Generation barrier scoped to one worker group.
///
/// Workers call [`GroupBarrier::wait`] at every tree-level boundary; nobody
/// proceeds to the next level until every participant has arrived, which is
/// what makes the level's writes visible to the whole group.
///
/// Unlike `std::sync::Barrier`, this barrier can be poisoned. When a worker
/// faults mid-kernel it never reaches the next boundary, so its siblings
/// would otherwise block forever; poisoning wakes them up and tells them to
/// abandon the kernel.
///
/// Every participant must reach every `wait` call of a kernel (uniform
/// control flow, as on the device this models). Kernels guard their work
/// instead of returning early between boundaries.
pub struct GroupBarrier {
    state: Mutex<BarrierState>,
    condvar: Condvar,
}

struct BarrierState {
    participants: u32,
    waiting: u32,
    generation: u64,
    poisoned: bool,
}

impl GroupBarrier {
    /// Barrier for a group of `participants` workers.
    pub fn new(participants: u32) -> Self {
        Self {
            state: Mutex::new(BarrierState {
                participants,
                waiting: 0,
                generation: 0,
                poisoned: false,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Blocks until the whole group reaches this level boundary.
    ///
    /// Returns `false` when the barrier was poisoned, in which case the
    /// caller must abandon the kernel body.
    #[must_use]
    pub fn wait(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.poisoned {
            return false;
        }
        state.waiting += 1;
        if state.waiting == state.participants {
            state.waiting = 0;
            state.generation += 1;
            self.condvar.notify_all();
            true
        } else {
            let generation = state.generation;
            while state.generation == generation && !state.poisoned {
                state = self.condvar.wait(state).unwrap();
            }
            !state.poisoned
        }
    }

    /// Marks the barrier as unusable and releases every blocked worker.
    pub fn poison(&self) {
        let mut state = self.state.lock().unwrap();
        state.poisoned = true;
        self.condvar.notify_all();
    }
}
