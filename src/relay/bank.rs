//! Relay bank — an ordered set of channels sharing one abort signal.
//!
//! ## Interrupt protocol
//!
//! Every "all" operation and every sequence starts with a **pulse** of the
//! abort signal: raise, hold for [`TimingConfig::abort_hold_ms`], clear.
//! Any timed close still waiting sees the raise and reopens its relay.
//! Because the signal is cleared again before new closes start, the pulse
//! never cancels the work the operation itself launches.
//!
//! `open_all` writes OPEN to every line *after* its pulse, so the bank's
//! write is the last one on each line no matter how the racing tasks were
//! scheduled.
//!
//! ## Ordering
//!
//! | Operation        | Ordering between channels                        |
//! |------------------|--------------------------------------------------|
//! | `close_all`      | none — all closes start together                 |
//! | `close_sequence` | strict — step N reopens before step N+1 closes   |

use std::collections::HashSet;
use std::sync::Arc;

use log::{error, info, warn};

use super::channel::{Channel, CloseOutcome};
use super::signal::AbortSignal;
use super::task::{SequenceOutcome, TaskHandle, spawn_named};
use super::{ChannelRef, RelayState};
use crate::config::{BankConfig, ChannelSpec, TimingConfig};
use crate::error::{ConfigError, Error, Result};
use crate::ports::{LineDriver, LineId};

/// A channel spec after validation: position resolved, empty name dropped.
struct ResolvedSpec {
    line: LineId,
    position: u32,
    name: Option<String>,
    initial_state: Option<RelayState>,
}

pub struct Bank {
    channels: Vec<Channel>,
    abort: AbortSignal,
    driver: Arc<dyn LineDriver>,
    timing: TimingConfig,
}

impl core::fmt::Debug for Bank {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bank")
            .field("channels", &self.channels)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl Bank {
    // ── Construction ──────────────────────────────────────────

    /// Build a bank with default timing.
    pub fn new(driver: Arc<dyn LineDriver>, specs: Vec<ChannelSpec>) -> Result<Self> {
        Self::with_timing(driver, specs, TimingConfig::default())
    }

    pub fn from_config(driver: Arc<dyn LineDriver>, config: BankConfig) -> Result<Self> {
        Self::with_timing(driver, config.channels, config.timing)
    }

    /// Validate every spec, set up the driver, bind the channels, then
    /// force every relay OPEN.
    ///
    /// Nothing is written to any line until the whole list has validated
    /// and every line has been accepted by the driver.
    pub fn with_timing(
        driver: Arc<dyn LineDriver>,
        specs: Vec<ChannelSpec>,
        timing: TimingConfig,
    ) -> Result<Self> {
        let resolved = resolve_specs(&[], specs)?;

        driver.setup()?;
        for spec in &resolved {
            configure_line(driver.as_ref(), spec.line)?;
        }

        let abort = AbortSignal::new();
        let channels = resolved
            .into_iter()
            .map(|s| {
                Channel::new(
                    driver.clone(),
                    abort.clone(),
                    s.line,
                    s.position,
                    s.name,
                    s.initial_state,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let bank = Self {
            channels,
            abort,
            driver,
            timing,
        };
        info!("Bank: {} channels", bank.channels.len());
        bank.open_all()?;
        Ok(bank)
    }

    /// Append one channel.
    ///
    /// The position defaults to one past the highest position in use.
    /// After any explicit initial state is applied the new relay is forced
    /// OPEN, like every channel at construction.
    pub fn add_channel(&mut self, spec: ChannelSpec) -> Result<&Channel> {
        let mut resolved = resolve_specs(&self.channels, vec![spec])?;
        let spec = resolved.remove(0);
        configure_line(self.driver.as_ref(), spec.line)?;

        let channel = Channel::new(
            self.driver.clone(),
            self.abort.clone(),
            spec.line,
            spec.position,
            spec.name,
            spec.initial_state,
        )?;
        channel.set_state(RelayState::Open)?;
        info!("Bank: added channel #{} on line {}", channel.position(), channel.line());
        self.channels.push(channel);
        Ok(&self.channels[self.channels.len() - 1])
    }

    // ── Queries ───────────────────────────────────────────────

    /// Resolve a position or name to its channel.
    pub fn channel(&self, r: impl Into<ChannelRef>) -> Result<&Channel> {
        resolve(&self.channels, &r.into())
    }

    /// Channels in construction order.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn abort_signal(&self) -> &AbortSignal {
        &self.abort
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// `(position, state)` of every channel, read live.
    pub fn states(&self) -> Result<Vec<(u32, RelayState)>> {
        self.channels
            .iter()
            .map(|c| Ok((c.position(), c.state()?)))
            .collect()
    }

    // ── Single-channel operations ─────────────────────────────

    /// Open one relay now.  Does not touch the abort signal, so timed
    /// closes on other channels keep running.
    pub fn open_channel(&self, r: impl Into<ChannelRef>) -> Result<()> {
        self.channel(r)?.set_state(RelayState::Open)
    }

    /// Close one relay for `duration_secs`, reopening in the background.
    pub fn close_channel(
        &self,
        r: impl Into<ChannelRef>,
        duration_secs: f64,
    ) -> Result<TaskHandle<CloseOutcome>> {
        self.channel(r)?.close(duration_secs)
    }

    // ── Bank-wide operations ──────────────────────────────────

    /// Emergency stop: cancel every timed close and force every relay OPEN.
    ///
    /// Every channel is attempted even if some writes fail; the first
    /// failure is returned.
    pub fn open_all(&self) -> Result<()> {
        self.pulse();
        let mut first_err = None;
        for channel in &self.channels {
            if let Err(e) = channel.set_state(RelayState::Open) {
                error!("open_all: channel #{} failed: {}", channel.position(), e);
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        info!("Bank: all {} channels OPEN", self.channels.len());
        first_err.map_or(Ok(()), Err)
    }

    /// Cancel running closes, then close every relay for `duration_secs`
    /// at once.
    ///
    /// Channels whose close fails are skipped; the others still run and
    /// the first failure is returned.
    pub fn close_all(&self, duration_secs: f64) -> Result<Vec<TaskHandle<CloseOutcome>>> {
        self.pulse();
        let mut handles = Vec::with_capacity(self.channels.len());
        let mut first_err = None;
        for channel in &self.channels {
            match channel.close(duration_secs) {
                Ok(h) => handles.push(h),
                Err(e) => {
                    error!("close_all: channel #{} failed: {}", channel.position(), e);
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(handles),
        }
    }

    /// Cancel running closes, then close the listed channels one after
    /// another on a background thread.
    ///
    /// Each step runs its full close → wait → reopen cycle before the next
    /// step starts.  If the abort signal trips, no further step starts.
    /// An unknown channel ends the sequence with
    /// [`Error::ChannelNotFound`], reported by [`TaskHandle::join`];
    /// steps before it stay done.
    pub fn close_sequence<R>(&self, steps: Vec<(R, f64)>) -> Result<TaskHandle<SequenceOutcome>>
    where
        R: Into<ChannelRef>,
    {
        let steps: Vec<(ChannelRef, f64)> = steps.into_iter().map(|(r, d)| (r.into(), d)).collect();
        self.pulse();

        let channels = self.channels.clone();
        let abort = self.abort.clone();
        let epoch = abort.epoch();
        spawn_named("relay-seq".into(), move || {
            run_sequence(&channels, &abort, epoch, &steps)
        })
    }

    // ── Internal ──────────────────────────────────────────────

    fn pulse(&self) {
        self.abort.pulse(self.timing.abort_hold());
    }
}

/// Body of the sequence task.
fn run_sequence(
    channels: &[Channel],
    abort: &AbortSignal,
    epoch: u64,
    steps: &[(ChannelRef, f64)],
) -> Result<SequenceOutcome> {
    info!("Sequence: {} steps", steps.len());
    for (i, (r, secs)) in steps.iter().enumerate() {
        if abort.tripped_since(epoch) {
            warn!("Sequence: aborted before step {} of {}", i + 1, steps.len());
            return Ok(SequenceOutcome {
                completed: i,
                aborted: true,
            });
        }
        let channel = resolve(channels, r).inspect_err(|_| {
            error!("Sequence: step {} names unknown channel {}", i + 1, r);
        })?;
        if channel.close_blocking(*secs)? == CloseOutcome::Aborted {
            warn!("Sequence: step {} of {} cut short by abort", i + 1, steps.len());
            return Ok(SequenceOutcome {
                completed: i + 1,
                aborted: true,
            });
        }
    }
    let aborted = abort.tripped_since(epoch);
    if aborted {
        warn!("Sequence: aborted after its last step");
    } else {
        info!("Sequence: complete");
    }
    Ok(SequenceOutcome {
        completed: steps.len(),
        aborted,
    })
}

/// First channel matching `r`.
fn resolve<'a>(channels: &'a [Channel], r: &ChannelRef) -> Result<&'a Channel> {
    channels
        .iter()
        .find(|c| c.matches(r))
        .ok_or_else(|| Error::ChannelNotFound(r.clone()))
}

fn configure_line(driver: &dyn LineDriver, line: LineId) -> Result<()> {
    driver
        .configure_output(line)
        .map_err(|source| ConfigError::InvalidLine { line, source }.into())
}

/// Validate `specs` against each other and against `existing` channels.
///
/// Positions default to the 1-based list index, offset by the highest
/// position among `existing`.
fn resolve_specs(existing: &[Channel], specs: Vec<ChannelSpec>) -> Result<Vec<ResolvedSpec>> {
    let mut positions: HashSet<u32> = existing.iter().map(Channel::position).collect();
    let mut names: HashSet<String> = existing
        .iter()
        .filter_map(|c| c.name().map(str::to_owned))
        .collect();
    let mut lines: HashSet<LineId> = existing.iter().map(Channel::line).collect();

    // Defaults count from the highest position already in use.
    let base = existing.iter().map(Channel::position).max().unwrap_or(0);

    let mut resolved = Vec::with_capacity(specs.len());
    for (idx, spec) in specs.into_iter().enumerate() {
        let position = match spec.position {
            Some(0) => return Err(ConfigError::InvalidPosition(0).into()),
            Some(p) => p,
            None => u32::try_from(idx)
                .ok()
                .and_then(|i| base.checked_add(i)?.checked_add(1))
                .ok_or(ConfigError::PositionsExhausted)?,
        };
        if !positions.insert(position) {
            return Err(ConfigError::DuplicatePosition(position).into());
        }
        let name = spec.name.filter(|n| !n.is_empty());
        if let Some(n) = &name {
            if !names.insert(n.clone()) {
                return Err(ConfigError::DuplicateName(n.clone()).into());
            }
        }
        if !lines.insert(spec.line) {
            return Err(ConfigError::DuplicateLine(spec.line).into());
        }
        resolved.push(ResolvedSpec {
            line: spec.line,
            position,
            name,
            initial_state: spec.initial_state,
        });
    }
    Ok(resolved)
}
