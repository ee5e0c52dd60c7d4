//! Bank configuration
//!
//! Channel specifications and timing parameters.  Loaded from JSON by the
//! runner; library callers usually build [`ChannelSpec`]s in code.

use std::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ConfigError, Result};
use crate::pins;
use crate::ports::LineId;
use crate::relay::RelayState;

/// One channel as described by the caller.  Validated by the bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Output line driving the relay coil.
    #[serde(alias = "pin")]
    pub line: LineId,
    /// Lookup position.  Defaults to the 1-based index in the list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    /// Optional lookup name.  Empty means none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// State forced at construction.  `None` leaves the line untouched.
    ///
    /// Also read from legacy numeric codes: `0` open, `1` closed, `-1`
    /// unknown.
    #[serde(
        default,
        alias = "state",
        deserialize_with = "deserialize_initial_state",
        skip_serializing_if = "Option::is_none"
    )]
    pub initial_state: Option<RelayState>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StateField {
    Named(RelayState),
    Code(i64),
    Text(String),
}

fn deserialize_initial_state<'de, D>(d: D) -> core::result::Result<Option<RelayState>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<StateField>::deserialize(d)? {
        None | Some(StateField::Code(-1)) => Ok(None),
        Some(StateField::Named(state)) => Ok(Some(state)),
        Some(StateField::Code(0)) => Ok(Some(RelayState::Open)),
        Some(StateField::Code(1)) => Ok(Some(RelayState::Closed)),
        Some(StateField::Text(t)) if t.eq_ignore_ascii_case("unknown") => Ok(None),
        Some(StateField::Code(c)) => Err(D::Error::custom(format!("unknown relay state code {c}"))),
        Some(StateField::Text(t)) => Err(D::Error::custom(format!("unknown relay state '{t}'"))),
    }
}

impl ChannelSpec {
    pub fn new(line: impl Into<LineId>) -> Self {
        Self {
            line: line.into(),
            position: None,
            name: None,
            initial_state: None,
        }
    }

    #[must_use]
    pub fn position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn initial_state(mut self, state: RelayState) -> Self {
        self.initial_state = Some(state);
        self
    }
}

/// Timing parameters for interrupt pulses and default holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// How long an abort pulse stays raised before it is cleared (ms).
    /// Bounds how late a waiting task may notice the abort.
    pub abort_hold_ms: u64,
    /// Hold time used when a close command gives none (seconds).
    pub default_close_secs: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            abort_hold_ms: 100,
            default_close_secs: 10.0,
        }
    }
}

impl TimingConfig {
    pub fn abort_hold(&self) -> Duration {
        Duration::from_millis(self.abort_hold_ms)
    }
}

/// Complete bank configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankConfig {
    pub channels: Vec<ChannelSpec>,
    #[serde(default)]
    pub timing: TimingConfig,
}

impl Default for BankConfig {
    fn default() -> Self {
        let names = ["front", "back"];
        let channels = pins::RELAY_LINES
            .iter()
            .enumerate()
            .map(|(i, &line)| {
                let spec = ChannelSpec::new(line);
                match names.get(i) {
                    Some(n) => spec.name(*n),
                    None => spec,
                }
            })
            .collect();
        Self {
            channels,
            timing: TimingConfig::default(),
        }
    }
}

/// Accepted JSON shapes: a full config object or a bare channel list.
#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigDocument {
    Full(BankConfig),
    Channels(Vec<ChannelSpec>),
}

impl BankConfig {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: ConfigDocument = serde_json::from_str(json).map_err(|e| {
            ConfigError::Malformed(format!(
                "expected a list of channel specs or {{\"channels\": [...]}}: {e}"
            ))
        })?;
        Ok(match doc {
            ConfigDocument::Full(cfg) => cfg,
            ConfigDocument::Channels(channels) => Self {
                channels,
                timing: TimingConfig::default(),
            },
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Malformed(e.to_string()).into())
    }
}
