//! Mock line hardware for integration tests.
//!
//! Wraps the in-memory driver so individual lines can be made to fail,
//! and provides builders for small test banks with short abort pulses.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use embedded_hal::digital::ErrorKind;
use parking_lot::Mutex;
use relaybank::adapters::memory::{LineWrite, MemoryLineDriver};
use relaybank::{Bank, ChannelSpec, LineDriver, LineError, LineId, TimingConfig};

/// Abort pulse hold used by every test bank.
pub const HOLD: Duration = Duration::from_millis(20);

/// Upper bound for "the task noticed the abort" checks.
pub const PROPAGATION: Duration = Duration::from_millis(100);

pub fn timing() -> TimingConfig {
    TimingConfig {
        abort_hold_ms: HOLD.as_millis() as u64,
        ..TimingConfig::default()
    }
}

/// Bank of `n` channels on lines `0..n`, positions `1..=n`.
///
/// The construction writes are cleared from the journal.
pub fn bank(n: u32) -> (Bank, Arc<MemoryLineDriver>) {
    let driver = Arc::new(MemoryLineDriver::new(n));
    let specs = (0..n).map(ChannelSpec::new).collect();
    let bank = Bank::with_timing(driver.clone(), specs, timing()).expect("test bank");
    driver.clear_journal();
    (bank, driver)
}

/// Levels written to `line`, oldest first.
pub fn levels(writes: &[LineWrite]) -> Vec<bool> {
    writes.iter().map(|w| w.level).collect()
}

// ── FaultyDriver ──────────────────────────────────────────────

/// Memory driver whose writes to selected lines fail.
pub struct FaultyDriver {
    pub inner: MemoryLineDriver,
    failing: Mutex<HashSet<LineId>>,
}

#[allow(dead_code)]
impl FaultyDriver {
    pub fn new(count: u32) -> Self {
        Self {
            inner: MemoryLineDriver::new(count),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_writes(&self, line: LineId) {
        self.failing.lock().insert(line);
    }

    pub fn heal(&self, line: LineId) {
        self.failing.lock().remove(&line);
    }
}

impl LineDriver for FaultyDriver {
    fn setup(&self) -> Result<(), LineError> {
        self.inner.setup()
    }

    fn configure_output(&self, line: LineId) -> Result<(), LineError> {
        self.inner.configure_output(line)
    }

    fn set(&self, line: LineId, level: bool) -> Result<(), LineError> {
        if self.failing.lock().contains(&line) {
            return Err(LineError::Hardware {
                line,
                kind: ErrorKind::Other,
            });
        }
        self.inner.set(line, level)
    }

    fn get(&self, line: LineId) -> Result<bool, LineError> {
        self.inner.get(line)
    }
}

/// Bank of `n` channels over a [`FaultyDriver`].
pub fn faulty_bank(n: u32) -> (Bank, Arc<FaultyDriver>) {
    let driver = Arc::new(FaultyDriver::new(n));
    let specs = (0..n).map(ChannelSpec::new).collect();
    let bank = Bank::with_timing(driver.clone(), specs, timing()).expect("test bank");
    driver.inner.clear_journal();
    (bank, driver)
}
