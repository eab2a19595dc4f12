//! Read-verify-act-reverify for one (identity, topic, role) tuple.
//!
//! Each pass is a short sequence of ledger reads and at most two writes
//! (register, then an optional stake top-up). No state survives a pass: the
//! next pass re-reads everything, which is what makes a crash or a lost
//! response between the write and the verifying read harmless.

use ocn_ledger::{
    AddStakeMsg, Address, Amount, LedgerReader, LedgerWriter, RegisterMsg, Role,
    SubmitError, TopicId, TxResult,
};
use tracing::{error, info, warn};

use crate::plan::{can_afford_registration, stake_satisfied, stake_top_up};
use crate::{
    Convergence, LedgerQuery, ReconcileFailure, RegistrationStep, ReputerConfig, StakeStep, Unmet,
    WorkerConfig,
};

/// Reconciles declared actor configs for a single identity.
///
/// Holds no mutable state. Calls for distinct topics may run concurrently;
/// calls for the same tuple are not serialized here.
pub struct Reconciler<R, W> {
    identity: Address,
    reader: R,
    writer: W,
}

impl<R, W> Reconciler<R, W>
where
    R: LedgerReader,
    W: LedgerWriter,
{
    pub fn new(identity: Address, reader: R, writer: W) -> Self {
        Self {
            identity,
            reader,
            writer,
        }
    }

    pub fn identity(&self) -> &Address {
        &self.identity
    }

    // ------------------------------------------------------------------
    // Public boundary: converged / not converged
    // ------------------------------------------------------------------

    /// `true` iff a ledger read taken during this call shows the identity
    /// registered as worker on `cfg.topic_id`.
    pub async fn reconcile_worker_registration(&self, cfg: &WorkerConfig) -> bool {
        let outcome = self.try_reconcile_worker_registration(cfg).await;
        log_outcome(&self.identity, Role::Worker, cfg.topic_id, &outcome);
        outcome.is_ok()
    }

    /// `true` iff reads taken during this call show the identity registered
    /// as reputer on `cfg.topic_id` with stake at or above `cfg.min_stake`.
    pub async fn reconcile_reputer_registration_and_stake(&self, cfg: &ReputerConfig) -> bool {
        let outcome = self.try_reconcile_reputer_registration_and_stake(cfg).await;
        log_outcome(&self.identity, Role::Reputer, cfg.topic_id, &outcome);
        outcome.is_ok()
    }

    // ------------------------------------------------------------------
    // Structured variants
    // ------------------------------------------------------------------

    pub async fn try_reconcile_worker_registration(
        &self,
        cfg: &WorkerConfig,
    ) -> Result<Convergence, ReconcileFailure> {
        let registration = self.ensure_registered(cfg.topic_id, Role::Worker).await?;
        Ok(Convergence::Worker { registration })
    }

    /// Phase A (registration) then phase B (stake). Phase B is entered only
    /// once a read has shown the identity registered.
    pub async fn try_reconcile_reputer_registration_and_stake(
        &self,
        cfg: &ReputerConfig,
    ) -> Result<Convergence, ReconcileFailure> {
        let registration = self.ensure_registered(cfg.topic_id, Role::Reputer).await?;
        let stake = self.ensure_min_stake(cfg.topic_id, cfg.min_stake).await?;
        Ok(Convergence::Reputer {
            registration,
            stake,
        })
    }

    // ------------------------------------------------------------------
    // Phases
    // ------------------------------------------------------------------

    async fn ensure_registered(
        &self,
        topic_id: TopicId,
        role: Role,
    ) -> Result<RegistrationStep, ReconcileFailure> {
        let read_failed = |query, after_write, error| ReconcileFailure::ReadFailure {
            topic_id,
            role,
            query,
            after_write,
            error,
        };

        let registered = self
            .reader
            .is_registered(topic_id, role, &self.identity)
            .await
            .map_err(|e| read_failed(LedgerQuery::Registration, false, e))?;
        if registered {
            info!(topic_id = %topic_id, role = %role, "already registered");
            return Ok(RegistrationStep::AlreadyRegistered);
        }

        let params = self
            .reader
            .chain_params()
            .await
            .map_err(|e| read_failed(LedgerQuery::ChainParams, false, e))?;
        let balance = self
            .reader
            .balance(&self.identity)
            .await
            .map_err(|e| read_failed(LedgerQuery::Balance, false, e))?;

        if !can_afford_registration(balance, params.registration_fee) {
            return Err(ReconcileFailure::InsufficientFunds {
                topic_id,
                role,
                balance,
                registration_fee: params.registration_fee,
            });
        }

        let msg = RegisterMsg::for_identity(&self.identity, topic_id, role);
        info!(
            topic_id = %topic_id,
            role = %role,
            address = %self.identity,
            balance = %balance,
            fee = %params.registration_fee,
            "submitting registration"
        );
        let submitted = self.writer.submit_register(&msg).await;
        log_submission("register", topic_id, role, &submitted);

        // Ground truth comes from this read, whatever the submission said.
        let registered = self
            .reader
            .is_registered(topic_id, role, &self.identity)
            .await
            .map_err(|e| read_failed(LedgerQuery::Registration, true, e))?;

        if registered {
            let tx_hash = submitted_tx_hash(&submitted);
            info!(
                topic_id = %topic_id,
                role = %role,
                tx_hash = tx_hash.as_deref().unwrap_or(""),
                "registration confirmed"
            );
            return Ok(RegistrationStep::Registered { tx_hash });
        }
        Err(not_converged(topic_id, role, Unmet::NotRegistered, submitted))
    }

    async fn ensure_min_stake(
        &self,
        topic_id: TopicId,
        min_stake: Amount,
    ) -> Result<StakeStep, ReconcileFailure> {
        let role = Role::Reputer;
        let read_failed = |after_write, error| ReconcileFailure::ReadFailure {
            topic_id,
            role,
            query: LedgerQuery::Stake,
            after_write,
            error,
        };

        let stake = self
            .reader
            .stake(topic_id, &self.identity)
            .await
            .map_err(|e| read_failed(false, e))?;

        let Some(stake_to_add) = stake_top_up(stake, min_stake) else {
            info!(
                topic_id = %topic_id,
                stake = %stake,
                min_stake = %min_stake,
                "stake already satisfied"
            );
            return Ok(StakeStep::AlreadySatisfied { stake });
        };

        let msg = AddStakeMsg {
            sender: self.identity.clone(),
            topic_id,
            amount: stake_to_add,
        };
        info!(
            topic_id = %topic_id,
            stake = %stake,
            min_stake = %min_stake,
            stake_to_add = %stake_to_add,
            "submitting stake top-up"
        );
        let submitted = self.writer.submit_add_stake(&msg).await;
        log_submission("add_stake", topic_id, role, &submitted);

        let stake_after = self
            .reader
            .stake(topic_id, &self.identity)
            .await
            .map_err(|e| read_failed(true, e))?;

        if stake_satisfied(stake_after, min_stake) {
            let tx_hash = submitted_tx_hash(&submitted);
            info!(
                topic_id = %topic_id,
                stake = %stake_after,
                min_stake = %min_stake,
                tx_hash = tx_hash.as_deref().unwrap_or(""),
                "stake top-up confirmed"
            );
            return Ok(StakeStep::ToppedUp {
                added: stake_to_add,
                stake: stake_after,
                tx_hash,
            });
        }
        let unmet = Unmet::StakeBelowMinimum {
            stake: stake_after,
            min_stake,
        };
        Err(not_converged(topic_id, role, unmet, submitted))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn submitted_tx_hash(submitted: &Result<TxResult, SubmitError>) -> Option<String> {
    match submitted {
        Ok(tx) => Some(tx.tx_hash.clone()),
        Err(e) => e.tx_hash.clone(),
    }
}

/// Classify a post-write read that did not show the target state.
///
/// A broadcast that came back with `success == false` is a submission
/// failure, same as an errored call.
fn not_converged(
    topic_id: TopicId,
    role: Role,
    unmet: Unmet,
    submitted: Result<TxResult, SubmitError>,
) -> ReconcileFailure {
    match submitted {
        Ok(tx) if tx.success => ReconcileFailure::VerificationFailure {
            topic_id,
            role,
            unmet,
            tx_hash: Some(tx.tx_hash),
        },
        Ok(tx) => ReconcileFailure::SubmissionFailure {
            topic_id,
            role,
            unmet,
            error: SubmitError::rejected("transaction reported failure").with_tx_hash(tx.tx_hash),
        },
        Err(error) => ReconcileFailure::SubmissionFailure {
            topic_id,
            role,
            unmet,
            error,
        },
    }
}

fn log_submission(
    what: &'static str,
    topic_id: TopicId,
    role: Role,
    submitted: &Result<TxResult, SubmitError>,
) {
    match submitted {
        Ok(tx) if tx.success => {
            info!(topic_id = %topic_id, role = %role, tx_hash = %tx.tx_hash, "{what} broadcast")
        }
        Ok(tx) => warn!(
            topic_id = %topic_id,
            role = %role,
            tx_hash = %tx.tx_hash,
            "{what} broadcast reported failure; verifying against ledger"
        ),
        Err(e) => warn!(
            topic_id = %topic_id,
            role = %role,
            tx_hash = e.tx_hash_or_empty(),
            error = %e,
            "{what} submission errored; verifying against ledger"
        ),
    }
}

pub(crate) fn log_outcome(
    identity: &Address,
    role: Role,
    topic_id: TopicId,
    outcome: &Result<Convergence, ReconcileFailure>,
) {
    match outcome {
        Ok(c) => info!(
            address = %identity,
            topic_id = %topic_id,
            role = %role,
            wrote = c.wrote(),
            "converged"
        ),
        Err(f) => error!(
            address = %identity,
            topic_id = %topic_id,
            role = %role,
            kind = f.kind().as_str(),
            tx_hash = f.tx_hash().unwrap_or(""),
            "not converged: {f}"
        ),
    }
}

