//! A single relay bound to one output line.
//!
//! The channel keeps no cached state: [`Channel::state`] always reads the
//! line back from the driver, so it reflects whatever the last writer
//! (a caller or the channel's own timed-close task) left there.
//!
//! ## Timed close
//!
//! [`Channel::close`] writes CLOSED synchronously, then hands the wait to a
//! background thread.  The thread reopens the relay when the hold time
//! runs out or when the bank's abort signal trips, whichever is first.
//! The reopen write happens in both cases.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use super::signal::{AbortSignal, WaitOutcome};
use super::task::{TaskHandle, spawn_named};
use super::{ChannelRef, RelayState};
use crate::error::Result;
use crate::ports::{LineDriver, LineId};

/// How a timed close ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The full hold time elapsed.
    Elapsed,
    /// The abort signal cut the hold short.
    Aborted,
}

impl From<WaitOutcome> for CloseOutcome {
    fn from(w: WaitOutcome) -> Self {
        match w {
            WaitOutcome::Elapsed => Self::Elapsed,
            WaitOutcome::Aborted => Self::Aborted,
        }
    }
}

/// One relay channel.
///
/// Cheap to clone: clones share the driver and abort signal, and every
/// clone drives the same line.
#[derive(Clone)]
pub struct Channel {
    line: LineId,
    position: u32,
    name: Option<String>,
    driver: Arc<dyn LineDriver>,
    abort: AbortSignal,
}

impl core::fmt::Debug for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Channel")
            .field("line", &self.line)
            .field("position", &self.position)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Channel {
    /// Bind a channel to `line`.
    ///
    /// With `Some(initial_state)` the state is written immediately; with
    /// `None` the line is left exactly as found.  The line is expected to
    /// be configured as an output already (the bank does this).
    pub fn new(
        driver: Arc<dyn LineDriver>,
        abort: AbortSignal,
        line: LineId,
        position: u32,
        name: Option<String>,
        initial_state: Option<RelayState>,
    ) -> Result<Self> {
        let channel = Self {
            line,
            position,
            name: name.filter(|n| !n.is_empty()),
            driver,
            abort,
        };
        if let Some(state) = initial_state {
            channel.set_state(state)?;
        }
        Ok(channel)
    }

    pub fn line(&self) -> LineId {
        self.line
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// True if `r` names this channel.
    pub fn matches(&self, r: &ChannelRef) -> bool {
        match r {
            ChannelRef::Position(p) => *p == self.position,
            ChannelRef::Name(n) => self.name.as_deref() == Some(n.as_str()),
        }
    }

    /// Live line level as a relay state.
    pub fn state(&self) -> Result<RelayState> {
        Ok(RelayState::from_level(self.driver.get(self.line)?))
    }

    /// Write `state` to the line.
    pub fn set_state(&self, state: RelayState) -> Result<()> {
        self.driver.set(self.line, state.level())?;
        debug!("relay {} -> {}", self.label(), state);
        Ok(())
    }

    /// Close for `duration_secs`, then reopen in the background.
    ///
    /// Returns once the CLOSED write is done.  A non-positive (or NaN)
    /// duration reopens at once; a duration too large to represent holds
    /// until the abort signal trips.  If the signal is already raised the
    /// relay still closes and reopens immediately.
    pub fn close(&self, duration_secs: f64) -> Result<TaskHandle<CloseOutcome>> {
        let hold = hold_duration(duration_secs);
        // Epoch first: a pulse racing the CLOSED write must still abort.
        let epoch = self.abort.epoch();
        self.set_state(RelayState::Closed)?;
        let start = Instant::now();
        info!("relay {} closed for {:?}", self.label(), hold);

        let channel = self.clone();
        let spawned = spawn_named(format!("relay-{}", self.position), move || {
            channel.finish_close(epoch, start, hold)
        });
        if spawned.is_err() {
            // Never leave a relay closed with nothing to reopen it.
            warn!("relay {}: no task to reopen, opening now", self.label());
            self.set_state(RelayState::Open)?;
        }
        spawned
    }

    /// Close, wait, and reopen on the calling thread.
    pub(crate) fn close_blocking(&self, duration_secs: f64) -> Result<CloseOutcome> {
        let hold = hold_duration(duration_secs);
        let epoch = self.abort.epoch();
        self.set_state(RelayState::Closed)?;
        info!("relay {} closed for {:?}", self.label(), hold);
        self.finish_close(epoch, Instant::now(), hold)
    }

    /// The WAITING state: block on deadline-or-abort, then reopen.
    fn finish_close(
        &self,
        epoch: u64,
        start: Instant,
        hold: Option<Duration>,
    ) -> Result<CloseOutcome> {
        let deadline = hold.and_then(|h| start.checked_add(h));
        let outcome = CloseOutcome::from(self.abort.wait(epoch, deadline));
        if let Err(e) = self.set_state(RelayState::Open) {
            error!("relay {}: reopen failed: {}", self.label(), e);
            return Err(e);
        }
        match outcome {
            CloseOutcome::Elapsed => {
                info!("relay {} reopened after {:?}", self.label(), start.elapsed())
            }
            CloseOutcome::Aborted => warn!(
                "relay {} reopened by abort after {:?}",
                self.label(),
                start.elapsed()
            ),
        }
        Ok(outcome)
    }

    fn label(&self) -> String {
        match &self.name {
            Some(n) => format!("#{} ({n})", self.position),
            None => format!("#{}", self.position),
        }
    }
}

/// Seconds → hold time.  `None` means "until aborted".
fn hold_duration(secs: f64) -> Option<Duration> {
    if secs.is_nan() || secs <= 0.0 {
        return Some(Duration::ZERO);
    }
    Duration::try_from_secs_f64(secs).ok()
}
