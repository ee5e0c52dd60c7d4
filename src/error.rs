//! Unified error types for the relay bank.
//!
//! A single `Error` enum that every operation funnels into, so callers can
//! branch on the kind of failure: a bad channel reference can be retried
//! with a corrected name, a configuration error is fatal to construction.

use core::fmt;

use crate::ports::{LineError, LineId};
use crate::relay::ChannelRef;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate returns this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The channel specification list is unusable. Raised only while a
    /// bank is being built or extended.
    Config(ConfigError),
    /// No channel matches the given position or name.
    ChannelNotFound(ChannelRef),
    /// The line driver failed a read or write.
    Line(LineError),
    /// A background task thread could not be started.
    TaskSpawn(String),
    /// A background task panicked before it could report.
    TaskPanicked(String),
}

impl Error {
    /// True for lookup failures (the reference may be corrected and retried).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ChannelNotFound(_))
    }

    /// True for construction-time misconfiguration.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration: {e}"),
            Self::ChannelNotFound(r) => write!(f, "channel not found: {r}"),
            Self::Line(e) => write!(f, "line: {e}"),
            Self::TaskSpawn(msg) => write!(f, "task spawn failed: {msg}"),
            Self::TaskPanicked(name) => write!(f, "task '{name}' panicked"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Line(e) => Some(e),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The input could not be parsed as a list of channel specifications.
    Malformed(String),
    /// Positions are 1-based; zero is rejected.
    InvalidPosition(u32),
    /// No default position is left above the highest one in use.
    PositionsExhausted,
    DuplicatePosition(u32),
    DuplicateName(String),
    /// Two channels would drive the same output line.
    DuplicateLine(LineId),
    /// The driver refused to configure the line as an output.
    InvalidLine { line: LineId, source: LineError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "malformed channel list: {msg}"),
            Self::InvalidPosition(p) => write!(f, "invalid position {p} (must be >= 1)"),
            Self::PositionsExhausted => write!(f, "no free default position left"),
            Self::DuplicatePosition(p) => write!(f, "duplicate position {p}"),
            Self::DuplicateName(n) => write!(f, "duplicate name '{n}'"),
            Self::DuplicateLine(l) => write!(f, "line {l} assigned to more than one channel"),
            Self::InvalidLine { line, source } => write!(f, "line {line} unusable: {source}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<LineError> for Error {
    fn from(e: LineError) -> Self {
        Self::Line(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
