use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::output::PipelineState;

/// Shared between the streaming thread and every waker.
///
/// `pending` is set by `wake` and consumed by `wait_for_work`. `closed` is
/// only ever written while the mutex is held, so a waiter that checks it
/// under the lock cannot miss the shutdown notification.
pub(crate) struct StreamSignal {
    pending: Mutex<bool>,
    cvar: Condvar,
    closed: AtomicBool,
    state: AtomicU8,
}

impl StreamSignal {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(false),
            cvar: Condvar::new(),
            closed: AtomicBool::new(false),
            state: AtomicU8::new(PipelineState::Uninitialized as u8),
        }
    }

    pub fn wake(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        *pending = true;
        self.cvar.notify_one();
    }

    pub fn close(&self) {
        let _pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        self.closed.store(true, Ordering::Release);
        self.cvar.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Block until woken. Returns false if the signal was closed instead.
    pub fn wait_for_work(&self) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        while !*pending && !self.is_closed() {
            pending = self.cvar.wait(pending).unwrap_or_else(|e| e.into_inner());
        }
        *pending = false;
        !self.is_closed()
    }

    /// Sleep for `timeout`, cut short only by close. Returns false if closed.
    pub fn sleep(&self, timeout: Duration) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if self.is_closed() {
            return false;
        }
        let _ = self
            .cvar
            .wait_timeout_while(pending, timeout, |_| !self.is_closed())
            .unwrap_or_else(|e| e.into_inner());
        !self.is_closed()
    }

    pub fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: PipelineState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Wakes the streaming thread after new work was queued.
///
/// Cheap to clone. Waking a closed pipeline does nothing.
#[derive(Clone)]
pub struct StreamWaker {
    signal: Arc<StreamSignal>,
}

impl StreamWaker {
    pub(crate) fn new(signal: Arc<StreamSignal>) -> Self {
        Self { signal }
    }

    pub fn wake(&self) {
        if !self.signal.is_closed() {
            self.signal.wake();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.signal.is_closed()
    }

    pub fn state(&self) -> PipelineState {
        self.signal.state()
    }
}
