//! Shared abort signal.
//!
//! A level-triggered flag broadcast to every waiting timed-close task of a
//! bank.  Raising it wakes all waiters at once; there is no per-task
//! cancellation.
//!
//! Each raise also bumps an epoch counter.  A waiter records the epoch when
//! it starts and treats any later epoch as an abort, so a pulse is seen even
//! if the flag has already been cleared again by the time the waiter runs.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;
use parking_lot::{Condvar, Mutex};

/// Why a wait on the signal returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The deadline passed with no abort.
    Elapsed,
    /// The signal was raised (or already raised) before the deadline.
    Aborted,
}

#[derive(Debug, Default)]
struct SignalState {
    raised: bool,
    /// Incremented on every clear → raised transition.
    epoch: u64,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<SignalState>,
    cond: Condvar,
}

/// Cloneable handle to one bank's abort signal.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    shared: Arc<Shared>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake every waiter.
    pub fn raise(&self) {
        let mut state = self.shared.state.lock();
        if !state.raised {
            state.raised = true;
            state.epoch = state.epoch.wrapping_add(1);
            debug!("abort signal raised (epoch {})", state.epoch);
        }
        self.shared.cond.notify_all();
    }

    pub fn clear(&self) {
        self.shared.state.lock().raised = false;
    }

    pub fn is_raised(&self) -> bool {
        self.shared.state.lock().raised
    }

    /// Current epoch.  Pass it to [`tripped_since`](Self::tripped_since) or
    /// [`wait`](Self::wait) to detect raises after this point.
    pub fn epoch(&self) -> u64 {
        self.shared.state.lock().epoch
    }

    /// True if the flag is raised now or has been raised since `epoch`.
    pub fn tripped_since(&self, epoch: u64) -> bool {
        let state = self.shared.state.lock();
        state.raised || state.epoch != epoch
    }

    /// Raise, hold for `hold` so waiters get scheduled, then clear.
    ///
    /// Blocks the caller for `hold`.  The flag is never left raised.
    pub fn pulse(&self, hold: Duration) {
        self.raise();
        thread::sleep(hold);
        self.clear();
    }

    /// Block until `deadline` passes or the signal trips relative to
    /// `epoch`.  `None` waits for the signal only.
    pub fn wait(&self, epoch: u64, deadline: Option<Instant>) -> WaitOutcome {
        let mut state = self.shared.state.lock();
        loop {
            if state.raised || state.epoch != epoch {
                return WaitOutcome::Aborted;
            }
            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return WaitOutcome::Elapsed;
                    }
                    // Spurious wakeups and timeouts both re-check above.
                    let _ = self.shared.cond.wait_until(&mut state, deadline);
                }
                None => self.shared.cond.wait(&mut state),
            }
        }
    }
}
