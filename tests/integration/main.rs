//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one area of the bank
//! against simulated lines.  All tests run on the host with no relay
//! hardware attached.

mod bank_tests;
mod fault_tests;
mod mock_hw;
