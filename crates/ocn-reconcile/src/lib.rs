//! ocn-reconcile
//!
//! Idempotent registration & stake reconciliation engine.
//!
//! For one actor (worker or reputer) on one topic the engine reads ledger
//! state, decides the single corrective action (if any), submits it, and
//! re-reads state to confirm. Decisions:
//! - Already registered => no write
//! - Balance below registration fee => no write, not converged
//! - Stake below minimum => top up by exactly the shortfall
//! - Converged is only ever reported from a read taken after the last write
//!
//! Stateless between calls: every pass re-derives ground truth from the
//! ledger, so re-invoking after a crash or a lost response is always safe.

mod engine;
mod pass;
mod plan;
mod types;

pub use engine::Reconciler;
pub use pass::{reconcile_all, PassReport, TupleOutcome};
pub use plan::{can_afford_registration, stake_satisfied, stake_top_up};
pub use types::*;
