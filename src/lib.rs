//! RelayBank library.
//!
//! Drives a bank of relays through digital output lines: timed closes
//! that reopen on their own, strict close sequences, and a bank-wide
//! abort that forces every relay open.  Hardware is reached only through
//! the [`ports::LineDriver`] trait.

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod error;
pub mod pins;
pub mod ports;
pub mod relay;

pub use config::{BankConfig, ChannelSpec, TimingConfig};
pub use error::{ConfigError, Error, Result};
pub use ports::{LineDriver, LineError, LineId};
pub use relay::{
    AbortSignal, Bank, Channel, ChannelRef, CloseOutcome, RelayState, SequenceOutcome, TaskHandle,
};
