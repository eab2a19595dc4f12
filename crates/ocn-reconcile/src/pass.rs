//! One reconciliation pass over every declared actor.
//!
//! Tuples are reconciled concurrently and independently: a failing tuple
//! never prevents the others from running.

use futures_util::future::join_all;
use ocn_ledger::{LedgerReader, LedgerWriter, Role, TopicId};
use serde::Serialize;

use crate::engine::log_outcome;
use crate::{Convergence, FailureKind, ReconcileFailure, Reconciler, ReputerConfig, WorkerConfig};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TupleOutcome {
    pub role: Role,
    pub topic_id: TopicId,
    pub converged: bool,
    /// Set only for converged tuples: whether a write was needed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrote: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl TupleOutcome {
    fn from_result(
        role: Role,
        topic_id: TopicId,
        result: Result<Convergence, ReconcileFailure>,
    ) -> Self {
        match result {
            Ok(c) => Self {
                role,
                topic_id,
                converged: true,
                wrote: Some(c.wrote()),
                failure: None,
                detail: None,
            },
            Err(f) => Self {
                role,
                topic_id,
                converged: false,
                wrote: None,
                failure: Some(f.kind()),
                detail: Some(f.to_string()),
            },
        }
    }
}

/// Outcomes of a pass, ordered by (role, topic).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub outcomes: Vec<TupleOutcome>,
}

impl PassReport {
    pub fn all_converged(&self) -> bool {
        self.outcomes.iter().all(|o| o.converged)
    }

    pub fn converged_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.converged).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &TupleOutcome> {
        self.outcomes.iter().filter(|o| !o.converged)
    }

    pub fn get(&self, role: Role, topic_id: TopicId) -> Option<&TupleOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.role == role && o.topic_id == topic_id)
    }
}

/// Reconcile every worker and reputer config once.
pub async fn reconcile_all<R, W>(
    reconciler: &Reconciler<R, W>,
    workers: &[WorkerConfig],
    reputers: &[ReputerConfig],
) -> PassReport
where
    R: LedgerReader,
    W: LedgerWriter,
{
    let worker_passes = workers.iter().map(|cfg| async move {
        let result = reconciler.try_reconcile_worker_registration(cfg).await;
        log_outcome(reconciler.identity(), Role::Worker, cfg.topic_id, &result);
        TupleOutcome::from_result(Role::Worker, cfg.topic_id, result)
    });
    let reputer_passes = reputers.iter().map(|cfg| async move {
        let result = reconciler
            .try_reconcile_reputer_registration_and_stake(cfg)
            .await;
        log_outcome(reconciler.identity(), Role::Reputer, cfg.topic_id, &result);
        TupleOutcome::from_result(Role::Reputer, cfg.topic_id, result)
    });

    let (mut outcomes, reputer_outcomes) =
        futures_util::join!(join_all(worker_passes), join_all(reputer_passes));
    outcomes.extend(reputer_outcomes);
    outcomes.sort_by_key(|o| (o.role, o.topic_id));

    PassReport { outcomes }
}
