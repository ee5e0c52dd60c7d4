//! Background task threads.
//!
//! Every timed close and every close sequence runs on its own named OS
//! thread.  The caller gets a [`TaskHandle`] it may join or simply drop;
//! dropping detaches the thread, which still runs to completion.

use std::thread::{self, JoinHandle};

use log::debug;

use crate::error::{Error, Result};

/// Stack size for relay task threads.  They only wait and toggle lines.
const TASK_STACK_KB: usize = 128;

/// Result of a completed [`Bank::close_sequence`](super::Bank::close_sequence).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceOutcome {
    /// Steps that ran their full close → reopen cycle (aborted steps count).
    pub completed: usize,
    /// The sequence stopped early because the abort signal tripped.
    pub aborted: bool,
}

/// Handle to a running background task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    name: String,
    inner: JoinHandle<Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Thread name, e.g. `relay-3` or `relay-seq`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Wait for the task and return what it produced.
    ///
    /// A panic inside the task is reported as [`Error::TaskPanicked`].
    pub fn join(self) -> Result<T> {
        let name = self.name;
        self.inner
            .join()
            .unwrap_or_else(|_| Err(Error::TaskPanicked(name)))
    }
}

/// Spawn `f` on a named thread.
pub(crate) fn spawn_named<T, F>(name: String, f: F) -> Result<TaskHandle<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    debug!("Spawning '{}' (stack={}KB)", name, TASK_STACK_KB);
    if spawn_refused() {
        return Err(Error::TaskSpawn(format!("{name}: spawn refused")));
    }
    let inner = thread::Builder::new()
        .name(name.clone())
        .stack_size(TASK_STACK_KB * 1024)
        .spawn(f)
        .map_err(|e| Error::TaskSpawn(format!("{name}: {e}")))?;
    Ok(TaskHandle { name, inner })
}

#[cfg(test)]
thread_local! {
    static FAIL_NEXT_SPAWN: core::cell::Cell<bool> = const { core::cell::Cell::new(false) };
}

/// Make the next `spawn_named` on this thread fail.
#[cfg(test)]
pub(crate) fn fail_next_spawn() {
    FAIL_NEXT_SPAWN.with(|f| f.set(true));
}

#[cfg(test)]
fn spawn_refused() -> bool {
    FAIL_NEXT_SPAWN.with(|f| f.replace(false))
}

#[cfg(not(test))]
const fn spawn_refused() -> bool {
    false
}
