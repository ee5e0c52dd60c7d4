//! Integration tests: single-channel and bank-wide operations.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use relaybank::adapters::memory::MemoryLineDriver;
use relaybank::{
    Bank, ChannelRef, ChannelSpec, CloseOutcome, ConfigError, Error, LineId, RelayState,
};

use super::mock_hw::{self, PROPAGATION, levels};

// ── Timed close ───────────────────────────────────────────────

#[test]
fn close_reopens_after_duration() {
    let (bank, driver) = mock_hw::bank(2);
    let start = Instant::now();
    let task = bank.close_channel(1u32, 0.1).unwrap();
    assert_eq!(bank.channel(1u32).unwrap().state().unwrap(), RelayState::Closed);

    assert_eq!(task.join().unwrap(), CloseOutcome::Elapsed);
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert_eq!(bank.channel(1u32).unwrap().state().unwrap(), RelayState::Open);
    assert_eq!(levels(&driver.writes_to(LineId(0))), vec![true, false]);
    assert!(driver.writes_to(LineId(1)).is_empty());
}

#[test]
fn dropped_handle_still_reopens() {
    let (bank, driver) = mock_hw::bank(1);
    drop(bank.close_channel(1u32, 0.05).unwrap());
    thread::sleep(Duration::from_millis(50) + PROPAGATION);
    assert_eq!(driver.level(LineId(0)), Some(false));
}

#[test]
fn close_by_name() {
    let driver = Arc::new(MemoryLineDriver::new(2));
    let bank = Bank::with_timing(
        driver.clone(),
        vec![
            ChannelSpec::new(0u32).name("front"),
            ChannelSpec::new(1u32).name("back"),
        ],
        mock_hw::timing(),
    )
    .unwrap();
    driver.clear_journal();

    bank.close_channel("back", 0.0).unwrap().join().unwrap();
    assert_eq!(levels(&driver.writes_to(LineId(1))), vec![true, false]);
    assert!(driver.writes_to(LineId(0)).is_empty());
}

// ── open_all ──────────────────────────────────────────────────

#[test]
fn open_all_interrupts_waiting_channels() {
    let (bank, driver) = mock_hw::bank(3);
    let tasks: Vec<_> = [1u32, 3]
        .into_iter()
        .map(|p| bank.close_channel(p, 30.0).unwrap())
        .collect();

    let start = Instant::now();
    bank.open_all().unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(!bank.abort_signal().is_raised());

    for t in tasks {
        assert_eq!(t.join().unwrap(), CloseOutcome::Aborted);
    }
    // No spurious re-close once everything settled.
    thread::sleep(PROPAGATION);
    for (_, state) in bank.states().unwrap() {
        assert_eq!(state, RelayState::Open);
    }
    for line in [LineId(0), LineId(2)] {
        let w = driver.writes_to(line);
        assert!(w.first().unwrap().level);
        assert!(!w.last().unwrap().level);
    }
}

#[test]
fn open_all_on_idle_bank_writes_open_everywhere() {
    let (bank, driver) = mock_hw::bank(4);
    bank.channel(2u32).unwrap().set_state(RelayState::Closed).unwrap();
    bank.open_all().unwrap();
    let j = driver.journal();
    assert_eq!(j.len(), 5);
    assert!(j[1..].iter().all(|w| !w.level));
}

// ── close_all ─────────────────────────────────────────────────

#[test]
fn close_all_closes_every_channel_together() {
    let (bank, driver) = mock_hw::bank(3);
    let tasks = bank.close_all(5.0).unwrap();
    assert_eq!(tasks.len(), 3);

    let closes: Vec<Instant> = driver
        .journal()
        .iter()
        .filter(|w| w.level)
        .map(|w| w.at)
        .collect();
    assert_eq!(closes.len(), 3);
    let first = *closes.iter().min().unwrap();
    let last = *closes.iter().max().unwrap();
    assert!(last.duration_since(first) < PROPAGATION);

    for (_, state) in bank.states().unwrap() {
        assert_eq!(state, RelayState::Closed);
    }
    bank.open_all().unwrap();
    for t in tasks {
        assert_eq!(t.join().unwrap(), CloseOutcome::Aborted);
    }
}

#[test]
fn close_all_cancels_running_closes_but_not_its_own() {
    let (bank, _driver) = mock_hw::bank(2);
    let earlier = bank.close_channel(1u32, 30.0).unwrap();
    let tasks = bank.close_all(0.05).unwrap();

    assert_eq!(earlier.join().unwrap(), CloseOutcome::Aborted);
    for t in tasks {
        assert_eq!(t.join().unwrap(), CloseOutcome::Elapsed);
    }
    for (_, state) in bank.states().unwrap() {
        assert_eq!(state, RelayState::Open);
    }
}

// ── Construction ──────────────────────────────────────────────

#[test]
fn duplicate_position_builds_nothing() {
    let driver = Arc::new(MemoryLineDriver::new(3));
    let err = Bank::new(
        driver.clone(),
        vec![
            ChannelSpec::new(0u32).position(1),
            ChannelSpec::new(1u32),
            ChannelSpec::new(2u32).position(1),
        ],
    )
    .unwrap_err();
    assert!(err.is_config());
    assert_eq!(err, Error::Config(ConfigError::DuplicatePosition(1)));
    assert!(driver.journal().is_empty());
    assert_eq!(driver.setup_calls(), 0);
}

#[test]
fn from_config_uses_its_timing() {
    let driver = Arc::new(MemoryLineDriver::new(2));
    let cfg = relaybank::BankConfig::from_json(
        r#"{"channels": [{"line": 0, "name": "a"}, {"pin": 1}], "timing": {"abort_hold_ms": 5}}"#,
    )
    .unwrap();
    let bank = Bank::from_config(driver, cfg).unwrap();
    assert_eq!(bank.timing().abort_hold_ms, 5);
    assert_eq!(bank.channel("a").unwrap().position(), 1);
    assert_eq!(bank.channel(2u32).unwrap().line(), LineId(1));
}

// ── Lookup failures ───────────────────────────────────────────

#[test]
fn unknown_channel_changes_nothing() {
    let (bank, driver) = mock_hw::bank(2);
    let err = bank.close_channel("nonexistent", 5.0).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err, Error::ChannelNotFound(ChannelRef::from("nonexistent")));

    assert!(bank.open_channel(9u32).unwrap_err().is_not_found());
    assert!(driver.journal().is_empty());
}

#[test]
fn set_state_round_trips_immediately() {
    let (bank, _driver) = mock_hw::bank(1);
    let ch = bank.channel(1u32).unwrap();
    ch.set_state(RelayState::Closed).unwrap();
    assert_eq!(ch.state().unwrap(), RelayState::Closed);
    bank.open_channel(1u32).unwrap();
    assert_eq!(ch.state().unwrap(), RelayState::Open);
}
