//! RelayBank — host runner
//!
//! Builds a bank from a JSON config against simulated lines, runs one
//! command, waits for every task it started, then prints the line journal.
//!
//! ```text
//! relaybank [--config bank.json] <command>
//!
//!   status                      print every channel's state
//!   open <ref>                  open one channel
//!   close <ref> [secs]          close one channel for secs
//!   open-all                    abort everything, open every channel
//!   close-all [secs]            close every channel together
//!   sequence <ref>[:secs]...    close channels one after another
//! ```
//!
//! `<ref>` is a position (digits) or a channel name.  Omitted hold times
//! use `timing.default_close_secs`.  `RUST_LOG` controls log output.
#![deny(unused_must_use)]

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use log::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use relaybank::adapters::memory::MemoryLineDriver;
use relaybank::{Bank, BankConfig, ChannelRef, RelayState};

// ── Command line ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Status,
    Open(ChannelRef),
    Close(ChannelRef, Option<f64>),
    OpenAll,
    CloseAll(Option<f64>),
    Sequence(Vec<(ChannelRef, Option<f64>)>),
}

#[derive(Debug)]
struct Invocation {
    config_path: Option<String>,
    command: Command,
}

fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut config_path = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" || arg == "-c" {
            let path = iter.next().context("--config needs a path")?;
            config_path = Some(path.clone());
        } else {
            rest.push(arg.as_str());
        }
    }

    let command = match rest.as_slice() {
        [] | ["status"] => Command::Status,
        ["open", r] => Command::Open(parse_ref(r)),
        ["close", r] => Command::Close(parse_ref(r), None),
        ["close", r, secs] => Command::Close(parse_ref(r), Some(parse_secs(secs)?)),
        ["open-all"] => Command::OpenAll,
        ["close-all"] => Command::CloseAll(None),
        ["close-all", secs] => Command::CloseAll(Some(parse_secs(secs)?)),
        ["sequence", steps @ ..] if !steps.is_empty() => Command::Sequence(
            steps
                .iter()
                .map(|s| parse_step(s))
                .collect::<Result<Vec<_>>>()?,
        ),
        other => bail!("unrecognised command: {}", other.join(" ")),
    };
    Ok(Invocation {
        config_path,
        command,
    })
}

fn parse_ref(s: &str) -> ChannelRef {
    match s.parse() {
        Ok(r) => r,
        Err(never) => match never {},
    }
}

fn parse_secs(s: &str) -> Result<f64> {
    s.parse::<f64>()
        .with_context(|| format!("'{s}' is not a duration in seconds"))
}

/// `ref` or `ref:secs`.
fn parse_step(s: &str) -> Result<(ChannelRef, Option<f64>)> {
    match s.rsplit_once(':') {
        Some((r, secs)) => Ok((parse_ref(r), Some(parse_secs(secs)?))),
        None => Ok((parse_ref(s), None)),
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = parse_args(&args)?;

    let config = match &invocation.config_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {path}"))?;
            BankConfig::from_json(&json).with_context(|| format!("parsing config {path}"))?
        }
        None => BankConfig::default(),
    };
    let default_secs = config.timing.default_close_secs;

    info!("RelayBank v{}", env!("CARGO_PKG_VERSION"));

    let driver = Arc::new(MemoryLineDriver::from_lines(
        config.channels.iter().map(|c| c.line),
    ));
    let bank = Bank::from_config(driver.clone(), config)?;
    driver.clear_journal();

    let start = Instant::now();
    run(&bank, invocation.command, default_secs)?;
    print_states(&bank)?;

    for w in driver.journal() {
        info!(
            "t+{:>8.3}s  line {:>3} <- {}",
            w.at.saturating_duration_since(start).as_secs_f64(),
            w.line,
            RelayState::from_level(w.level)
        );
    }
    Ok(())
}

fn run(bank: &Bank, command: Command, default_secs: f64) -> Result<()> {
    match command {
        Command::Status => {}
        Command::Open(r) => bank.open_channel(r)?,
        Command::Close(r, secs) => {
            let outcome = bank.close_channel(r, secs.unwrap_or(default_secs))?.join()?;
            info!("close finished: {:?}", outcome);
        }
        Command::OpenAll => bank.open_all()?,
        Command::CloseAll(secs) => {
            for task in bank.close_all(secs.unwrap_or(default_secs))? {
                let name = task.name().to_owned();
                info!("{} finished: {:?}", name, task.join()?);
            }
        }
        Command::Sequence(steps) => {
            let steps = steps
                .into_iter()
                .map(|(r, secs)| (r, secs.unwrap_or(default_secs)))
                .collect();
            let outcome = bank.close_sequence::<ChannelRef>(steps)?.join()?;
            info!(
                "sequence finished: {} steps, aborted={}",
                outcome.completed, outcome.aborted
            );
        }
    }
    Ok(())
}

fn print_states(bank: &Bank) -> Result<()> {
    for (channel, (position, state)) in bank.channels().iter().zip(bank.states()?) {
        info!(
            "#{:<3} {:<12} line {:>3}  {}",
            position,
            channel.name().unwrap_or("-"),
            channel.line(),
            state
        );
    }
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_timer(fmt::time::uptime())
        .init();
}
