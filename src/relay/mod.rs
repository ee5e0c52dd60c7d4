//! Relay core — channels, the bank that owns them, and the abort signal
//! that coordinates their timed closes.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  Bank                                                     │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐                      │
//! │  │ Channel │ │ Channel │ │ Channel │  ... (ordered)       │
//! │  └────┬────┘ └────┬────┘ └────┬────┘                      │
//! │       │           │           │                           │
//! │       └───────────┴─────┬─────┘                           │
//! │                   AbortSignal (shared)                    │
//! └─────────────────────────┬─────────────────────────────────┘
//!                           ▼
//!                      LineDriver
//! ```
//!
//! Timed-close lifecycle of a single channel:
//!
//! ```text
//! OPEN ──close(d)──▶ [write CLOSED] ──▶ WAITING(deadline = now + d)
//! WAITING ──deadline passes──▶ [write OPEN] ──▶ OPEN
//! WAITING ──abort raised────▶ [write OPEN] ──▶ OPEN
//! ```

pub mod bank;
pub mod channel;
pub mod signal;
pub mod task;

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Relay state
// ---------------------------------------------------------------------------

/// Contact state of a relay, mapped one-to-one onto the line level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayState {
    /// Coil de-energised, line low.
    Open,
    /// Coil energised, line high.
    Closed,
}

impl RelayState {
    /// Line level that produces this state.
    pub const fn level(self) -> bool {
        matches!(self, Self::Closed)
    }

    pub const fn from_level(level: bool) -> Self {
        if level { Self::Closed } else { Self::Open }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

// ---------------------------------------------------------------------------
// Channel reference
// ---------------------------------------------------------------------------

/// How a caller names a channel: by its position or by its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelRef {
    Position(u32),
    Name(String),
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(p) => write!(f, "#{p}"),
            Self::Name(n) => write!(f, "'{n}'"),
        }
    }
}

impl From<u32> for ChannelRef {
    fn from(position: u32) -> Self {
        Self::Position(position)
    }
}

impl From<&str> for ChannelRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for ChannelRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&ChannelRef> for ChannelRef {
    fn from(r: &ChannelRef) -> Self {
        r.clone()
    }
}

/// Digits parse as a position, anything else is a name.
impl FromStr for ChannelRef {
    type Err = core::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<u32>()
            .map_or_else(|_| Self::Name(s.to_owned()), Self::Position))
    }
}

pub use bank::Bank;
pub use channel::{Channel, CloseOutcome};
pub use signal::AbortSignal;
pub use task::{SequenceOutcome, TaskHandle};
