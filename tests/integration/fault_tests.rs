//! Integration tests: line write failures.

use std::time::Duration;

use embedded_hal::digital::ErrorKind;
use relaybank::{Error, LineError, LineId, RelayState};

use super::mock_hw::{self, levels};

fn hw_err(line: u32) -> Error {
    Error::Line(LineError::Hardware {
        line: LineId(line),
        kind: ErrorKind::Other,
    })
}

#[test]
fn open_all_tries_every_channel() {
    let (bank, driver) = mock_hw::faulty_bank(3);
    for p in [1u32, 2, 3] {
        bank.channel(p).unwrap().set_state(RelayState::Closed).unwrap();
    }
    driver.fail_writes(LineId(1));
    driver.inner.clear_journal();

    assert_eq!(bank.open_all().unwrap_err(), hw_err(1));
    assert_eq!(driver.inner.level(LineId(0)), Some(false));
    assert_eq!(driver.inner.level(LineId(1)), Some(true));
    assert_eq!(driver.inner.level(LineId(2)), Some(false));
}

#[test]
fn failed_close_write_starts_no_task() {
    let (bank, driver) = mock_hw::faulty_bank(2);
    driver.fail_writes(LineId(1));

    assert_eq!(bank.close_channel(2u32, 5.0).unwrap_err(), hw_err(1));
    assert!(driver.inner.journal().is_empty());
    assert_eq!(bank.channel(2u32).unwrap().state().unwrap(), RelayState::Open);
}

#[test]
fn failed_reopen_is_reported_by_join() {
    let (bank, driver) = mock_hw::faulty_bank(1);
    let task = bank.close_channel(1u32, 0.05).unwrap();
    driver.fail_writes(LineId(0));

    assert_eq!(task.join().unwrap_err(), hw_err(0));
    assert_eq!(levels(&driver.inner.writes_to(LineId(0))), vec![true]);

    driver.heal(LineId(0));
    bank.open_all().unwrap();
    assert_eq!(driver.inner.level(LineId(0)), Some(false));
}

#[test]
fn close_all_runs_healthy_channels_and_reports_first_failure() {
    let (bank, driver) = mock_hw::faulty_bank(3);
    driver.fail_writes(LineId(0));

    assert_eq!(bank.close_all(0.02).unwrap_err(), hw_err(0));
    // The healthy channels were still closed and reopen on their own.
    std::thread::sleep(Duration::from_millis(20) + mock_hw::PROPAGATION);
    for line in [LineId(1), LineId(2)] {
        assert_eq!(levels(&driver.inner.writes_to(line)), vec![true, false]);
    }
}
