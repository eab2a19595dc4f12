//! ocn-ledger
//!
//! Ledger boundary for the off-chain node.
//!
//! This crate owns the domain types shared by every other crate (identity,
//! topic, role, amounts, messages), the read/write collaborator traits the
//! reconciliation engine consumes, and the ledger-side adapters that do not
//! need a network:
//!
//! - [`RetryingWriter`]: at-least-once submission with backoff.
//! - [`DryRunWriter`]: never broadcasts (wallet `submit_tx = false`).
//! - [`PaperLedger`]: deterministic in-memory ledger.
//!
//! No signing, no transaction encoding. Concrete network clients live in
//! `ocn-ledger-rest`.

mod client;
mod dry_run;
mod error;
mod paper;
mod retry;
mod types;

pub use client::{LedgerReader, LedgerWriter};
pub use dry_run::DryRunWriter;
pub use error::{LedgerError, SubmitError, SubmitErrorKind};
pub use paper::PaperLedger;
pub use retry::{RetryPolicy, RetryingWriter};
pub use types::{
    AddStakeMsg, Address, Amount, AmountParseError, ChainParams, LedgerMsg, RegisterMsg, Role,
    TopicId, TxResult,
};
