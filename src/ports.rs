//! Port traits — the boundary between relay logic and the line hardware.
//!
//! ```text
//!   Bank / Channel ──▶ LineDriver ──▶ adapter (GPIO HAL, simulation)
//! ```
//!
//! The relay core never touches pins directly.  It only asks a
//! [`LineDriver`] to drive an output line high or low and to report the
//! level it is currently driving.  Concrete drivers live in
//! [`adapters`](crate::adapters).

use core::fmt;

use embedded_hal::digital::ErrorKind;
use serde::{Deserialize, Serialize};

// ───────────────────────────────────────────────────────────────
// Line handle
// ───────────────────────────────────────────────────────────────

/// Opaque handle to one digital output line.
///
/// The numbering scheme belongs to the driver (BCM GPIO, wiringPi, a
/// port-expander bit, ...).  The core only compares and forwards it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(pub u32);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for LineId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

// ───────────────────────────────────────────────────────────────
// Line driver port
// ───────────────────────────────────────────────────────────────

/// Capability to drive digital output lines.
///
/// Shared by reference across every timed-close thread, hence `Send + Sync`
/// and `&self` receivers.  Implementations serialise access per line
/// internally.
pub trait LineDriver: Send + Sync {
    /// One-time driver initialisation.  Called by the bank before any line
    /// is used.  Must be idempotent.
    fn setup(&self) -> Result<(), LineError>;

    /// Put `line` into output mode.  Fails with [`LineError::InvalidLine`]
    /// for handles the driver does not know.
    fn configure_output(&self, line: LineId) -> Result<(), LineError>;

    /// Drive `line` to `level` (true = high).
    fn set(&self, line: LineId, level: bool) -> Result<(), LineError>;

    /// Level currently driven on `line`.
    fn get(&self, line: LineId) -> Result<bool, LineError>;
}

// ───────────────────────────────────────────────────────────────
// Error type
// ───────────────────────────────────────────────────────────────

/// Errors from [`LineDriver`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineError {
    /// The handle does not name a line this driver controls.
    InvalidLine(LineId),
    /// Driver initialisation failed.
    SetupFailed(&'static str),
    /// The pin rejected a read or write.
    Hardware { line: LineId, kind: ErrorKind },
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLine(line) => write!(f, "no such line {line}"),
            Self::SetupFailed(msg) => write!(f, "driver setup failed: {msg}"),
            Self::Hardware { line, kind } => write!(f, "line {line} I/O error: {kind:?}"),
        }
    }
}

impl std::error::Error for LineError {}
