//! In-memory line driver.
//!
//! Simulates a bank of output lines on the host.  Every write is appended
//! to a timestamped journal so the runner can print what happened and the
//! tests can assert on ordering and timing.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use log::{debug, info};
use parking_lot::Mutex;

use crate::ports::{LineDriver, LineError, LineId};

/// One recorded line write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineWrite {
    pub line: LineId,
    pub level: bool,
    pub at: Instant,
}

#[derive(Debug, Default)]
struct Lines {
    levels: BTreeMap<LineId, bool>,
    outputs: BTreeSet<LineId>,
    journal: Vec<LineWrite>,
    setup_calls: u32,
}

/// Simulated output lines, all starting low.
#[derive(Debug)]
pub struct MemoryLineDriver {
    lines: Mutex<Lines>,
}

impl MemoryLineDriver {
    /// Lines `0..count`.
    pub fn new(count: u32) -> Self {
        Self::from_lines((0..count).map(LineId))
    }

    /// Exactly the given lines; any other handle is invalid.
    pub fn from_lines(lines: impl IntoIterator<Item = LineId>) -> Self {
        let levels = lines.into_iter().map(|l| (l, false)).collect();
        Self {
            lines: Mutex::new(Lines {
                levels,
                ..Lines::default()
            }),
        }
    }

    /// Copy of every write so far, oldest first.
    pub fn journal(&self) -> Vec<LineWrite> {
        self.lines.lock().journal.clone()
    }

    /// Writes to one line, oldest first.
    pub fn writes_to(&self, line: LineId) -> Vec<LineWrite> {
        self.lines
            .lock()
            .journal
            .iter()
            .filter(|w| w.line == line)
            .copied()
            .collect()
    }

    pub fn clear_journal(&self) {
        self.lines.lock().journal.clear();
    }

    /// Current level, or `None` for an unknown line.
    pub fn level(&self, line: LineId) -> Option<bool> {
        self.lines.lock().levels.get(&line).copied()
    }

    pub fn is_output(&self, line: LineId) -> bool {
        self.lines.lock().outputs.contains(&line)
    }

    pub fn setup_calls(&self) -> u32 {
        self.lines.lock().setup_calls
    }
}

impl LineDriver for MemoryLineDriver {
    fn setup(&self) -> Result<(), LineError> {
        let mut lines = self.lines.lock();
        lines.setup_calls += 1;
        if lines.setup_calls == 1 {
            info!("memory driver: {} simulated lines", lines.levels.len());
        }
        Ok(())
    }

    fn configure_output(&self, line: LineId) -> Result<(), LineError> {
        let mut lines = self.lines.lock();
        if !lines.levels.contains_key(&line) {
            return Err(LineError::InvalidLine(line));
        }
        lines.outputs.insert(line);
        Ok(())
    }

    fn set(&self, line: LineId, level: bool) -> Result<(), LineError> {
        let mut lines = self.lines.lock();
        let slot = lines
            .levels
            .get_mut(&line)
            .ok_or(LineError::InvalidLine(line))?;
        *slot = level;
        lines.journal.push(LineWrite {
            line,
            level,
            at: Instant::now(),
        });
        debug!("line {} <- {}", line, u8::from(level));
        Ok(())
    }

    fn get(&self, line: LineId) -> Result<bool, LineError> {
        self.level(line).ok_or(LineError::InvalidLine(line))
    }
}
