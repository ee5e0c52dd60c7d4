//! embedded-hal line driver.
//!
//! Binds any set of `embedded-hal` 1.0 [`StatefulOutputPin`]s to line
//! handles, so the relay core can run on whatever HAL the board uses
//! (`rppal`, `linux-embedded-hal`, `esp-idf-hal`, ...).  The HAL owns pin
//! claiming and direction; by the time a pin is registered here it is
//! already an output.
//!
//! Each pin sits behind its own mutex, so different channels never contend.

use embedded_hal::digital::{Error as _, PinState, StatefulOutputPin};
use log::{info, warn};
use parking_lot::Mutex;

use crate::ports::{LineDriver, LineError, LineId};

pub struct HalLineDriver<P> {
    pins: Vec<(LineId, Mutex<P>)>,
}

impl<P> Default for HalLineDriver<P> {
    fn default() -> Self {
        Self { pins: Vec::new() }
    }
}

impl<P: StatefulOutputPin> HalLineDriver<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pin` as `line`.  A later registration of the same line
    /// replaces the earlier one.
    #[must_use]
    pub fn with_pin(mut self, line: LineId, pin: P) -> Self {
        if let Some(slot) = self.pins.iter_mut().find(|(l, _)| *l == line) {
            warn!("hal driver: line {} registered twice, replacing", line);
            slot.1 = Mutex::new(pin);
        } else {
            self.pins.push((line, Mutex::new(pin)));
        }
        self
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    fn pin(&self, line: LineId) -> Result<&Mutex<P>, LineError> {
        self.pins
            .iter()
            .find(|(l, _)| *l == line)
            .map(|(_, p)| p)
            .ok_or(LineError::InvalidLine(line))
    }
}

impl<P> LineDriver for HalLineDriver<P>
where
    P: StatefulOutputPin + Send,
{
    fn setup(&self) -> Result<(), LineError> {
        info!("hal driver: {} output pins", self.pins.len());
        Ok(())
    }

    fn configure_output(&self, line: LineId) -> Result<(), LineError> {
        self.pin(line).map(|_| ())
    }

    fn set(&self, line: LineId, level: bool) -> Result<(), LineError> {
        self.pin(line)?
            .lock()
            .set_state(PinState::from(level))
            .map_err(|e| LineError::Hardware { line, kind: e.kind() })
    }

    fn get(&self, line: LineId) -> Result<bool, LineError> {
        self.pin(line)?
            .lock()
            .is_set_high()
            .map_err(|e| LineError::Hardware { line, kind: e.kind() })
    }
}
