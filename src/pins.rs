//! Default line assignments for the reference relay board.
//!
//! Single source of truth for the lines a [`BankConfig::default`](crate::config::BankConfig)
//! uses.  A 4-channel opto-isolated relay HAT, numbered the way the board's
//! driver numbers its outputs.

use crate::ports::LineId;

/// Relay K1 — "front".
pub const RELAY_1_LINE: LineId = LineId(0);
/// Relay K2 — "back".
pub const RELAY_2_LINE: LineId = LineId(1);
/// Relay K3.
pub const RELAY_3_LINE: LineId = LineId(2);
/// Relay K4.
pub const RELAY_4_LINE: LineId = LineId(3);

/// All default relay lines in board order.
pub const RELAY_LINES: [LineId; 4] = [RELAY_1_LINE, RELAY_2_LINE, RELAY_3_LINE, RELAY_4_LINE];
