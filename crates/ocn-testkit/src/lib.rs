//! ocn-testkit
//!
//! Test doubles for the ledger boundary. Intended ONLY for tests: nothing in
//! here talks to a network.

mod fake_ledger;

pub use fake_ledger::{FakeLedger, LedgerCall, StakeApply};
