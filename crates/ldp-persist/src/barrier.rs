use std::sync::{Condvar, Mutex};

use tracing::debug;

#[derive(Debug, Default)]
struct BarrierState {
    active: usize,
    /// Incremented every time the active count drops to zero.
    generation: u64,
}

/// Rendezvous between in-flight operations and the commit/rollback path.
///
/// Every operation holds a [`BarrierGuard`] for its whole duration. The
/// lifecycle path calls [`await_quiescence`](Self::await_quiescence), which
/// blocks until no guard is held. Callers that must not start after the
/// lifecycle path begins enter first and check session state second.
#[derive(Debug, Default)]
pub struct QuiescenceBarrier {
    state: Mutex<BarrierState>,
    drained: Condvar,
}

impl QuiescenceBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an in-flight operation until the guard is dropped.
    pub fn enter(&self) -> BarrierGuard<'_> {
        let mut state = self.state.lock().expect("barrier lock poisoned");
        state.active += 1;
        BarrierGuard { barrier: self }
    }

    /// Number of operations currently registered.
    pub fn active(&self) -> usize {
        self.state.lock().expect("barrier lock poisoned").active
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().expect("barrier lock poisoned").generation
    }

    /// Block until no operation is registered. Returns the generation
    /// observed once quiet.
    pub fn await_quiescence(&self) -> u64 {
        let mut state = self.state.lock().expect("barrier lock poisoned");
        if state.active > 0 {
            debug!(active = state.active, "waiting for in-flight operations");
        }
        while state.active > 0 {
            state = self.drained.wait(state).expect("barrier lock poisoned");
        }
        state.generation
    }

    fn leave(&self) {
        let mut state = self.state.lock().expect("barrier lock poisoned");
        state.active -= 1;
        if state.active == 0 {
            state.generation += 1;
            self.drained.notify_all();
        }
    }
}

/// Registration held by one in-flight operation.
#[must_use = "the operation is deregistered as soon as the guard is dropped"]
#[derive(Debug)]
pub struct BarrierGuard<'a> {
    barrier: &'a QuiescenceBarrier,
}

impl Drop for BarrierGuard<'_> {
    fn drop(&mut self) {
        self.barrier.leave();
    }
}
