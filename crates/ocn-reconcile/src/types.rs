use std::fmt;

use ocn_ledger::{Amount, LedgerError, Role, SubmitError, TopicId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Desired state
// ---------------------------------------------------------------------------

/// "This identity is registered as worker on `topic_id`."
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    pub topic_id: TopicId,
}

/// "This identity is registered as reputer on `topic_id` with stake >= `min_stake`."
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReputerConfig {
    pub topic_id: TopicId,
    pub min_stake: Amount,
}

// ---------------------------------------------------------------------------
// Convergence evidence
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationStep {
    /// Registered on entry; nothing was written.
    AlreadyRegistered,
    /// A register message was submitted and a later read confirmed it.
    /// `tx_hash` is `None` when the submission itself errored without one.
    Registered { tx_hash: Option<String> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StakeStep {
    /// Stake was already at or above the minimum; nothing was written.
    AlreadySatisfied { stake: Amount },
    /// `added` was submitted and the re-read `stake` meets the minimum.
    ToppedUp {
        added: Amount,
        stake: Amount,
        tx_hash: Option<String>,
    },
}

/// What a converged pass observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Convergence {
    Worker {
        registration: RegistrationStep,
    },
    Reputer {
        registration: RegistrationStep,
        stake: StakeStep,
    },
}

impl Convergence {
    /// `true` if the pass submitted at least one write.
    pub fn wrote(&self) -> bool {
        let registered = |r: &RegistrationStep| matches!(r, RegistrationStep::Registered { .. });
        match self {
            Convergence::Worker { registration } => registered(registration),
            Convergence::Reputer {
                registration,
                stake,
            } => registered(registration) || matches!(stake, StakeStep::ToppedUp { .. }),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure taxonomy
// ---------------------------------------------------------------------------

/// Failure category, stable for logs and summaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ReadFailure,
    InsufficientFunds,
    /// The write errored and the re-read shows the target not reached.
    SubmissionFailure,
    /// The write reported success but the re-read shows the target not reached.
    VerificationFailure,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ReadFailure => "read_failure",
            FailureKind::InsufficientFunds => "insufficient_funds",
            FailureKind::SubmissionFailure => "submission_failure",
            FailureKind::VerificationFailure => "verification_failure",
        }
    }
}

/// Which ledger query failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerQuery {
    Registration,
    ChainParams,
    Balance,
    Stake,
}

impl LedgerQuery {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerQuery::Registration => "registration",
            LedgerQuery::ChainParams => "chain_params",
            LedgerQuery::Balance => "balance",
            LedgerQuery::Stake => "stake",
        }
    }
}

/// The desired state a post-write read did not observe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Unmet {
    NotRegistered,
    StakeBelowMinimum { stake: Amount, min_stake: Amount },
}

impl fmt::Display for Unmet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unmet::NotRegistered => write!(f, "still not registered"),
            Unmet::StakeBelowMinimum { stake, min_stake } => {
                write!(f, "stake {stake} still below minimum {min_stake}")
            }
        }
    }
}

/// Why a pass did not converge. Reduced to `false` at the public boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileFailure {
    ReadFailure {
        topic_id: TopicId,
        role: Role,
        query: LedgerQuery,
        /// `true` when this was the verifying read after a submission.
        after_write: bool,
        error: LedgerError,
    },
    InsufficientFunds {
        topic_id: TopicId,
        role: Role,
        balance: Amount,
        registration_fee: Amount,
    },
    SubmissionFailure {
        topic_id: TopicId,
        role: Role,
        unmet: Unmet,
        error: SubmitError,
    },
    VerificationFailure {
        topic_id: TopicId,
        role: Role,
        unmet: Unmet,
        tx_hash: Option<String>,
    },
}

impl ReconcileFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            ReconcileFailure::ReadFailure { .. } => FailureKind::ReadFailure,
            ReconcileFailure::InsufficientFunds { .. } => FailureKind::InsufficientFunds,
            ReconcileFailure::SubmissionFailure { .. } => FailureKind::SubmissionFailure,
            ReconcileFailure::VerificationFailure { .. } => FailureKind::VerificationFailure,
        }
    }

    pub fn topic_id(&self) -> TopicId {
        match self {
            ReconcileFailure::ReadFailure { topic_id, .. }
            | ReconcileFailure::InsufficientFunds { topic_id, .. }
            | ReconcileFailure::SubmissionFailure { topic_id, .. }
            | ReconcileFailure::VerificationFailure { topic_id, .. } => *topic_id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            ReconcileFailure::ReadFailure { role, .. }
            | ReconcileFailure::InsufficientFunds { role, .. }
            | ReconcileFailure::SubmissionFailure { role, .. }
            | ReconcileFailure::VerificationFailure { role, .. } => *role,
        }
    }

    /// Tx hash associated with the failure, when one is known.
    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            ReconcileFailure::SubmissionFailure { error, .. } => error.tx_hash.as_deref(),
            ReconcileFailure::VerificationFailure { tx_hash, .. } => tx_hash.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for ReconcileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileFailure::ReadFailure {
                topic_id,
                role,
                query,
                after_write,
                error,
            } => {
                let when = if *after_write { "verifying" } else { "initial" };
                write!(
                    f,
                    "{role} topic={topic_id}: {when} {} read failed: {error}",
                    query.as_str()
                )
            }
            ReconcileFailure::InsufficientFunds {
                topic_id,
                role,
                balance,
                registration_fee,
            } => write!(
                f,
                "{role} topic={topic_id}: balance {balance} below registration fee {registration_fee}"
            ),
            ReconcileFailure::SubmissionFailure {
                topic_id,
                role,
                unmet,
                error,
            } => write!(f, "{role} topic={topic_id}: {unmet} after {error}"),
            ReconcileFailure::VerificationFailure {
                topic_id,
                role,
                unmet,
                tx_hash,
            } => write!(
                f,
                "{role} topic={topic_id}: {unmet} after successful submission (tx_hash={})",
                tx_hash.as_deref().unwrap_or("")
            ),
        }
    }
}

impl std::error::Error for ReconcileFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_failure_display_names_the_gap() {
        let f = ReconcileFailure::VerificationFailure {
            topic_id: TopicId(3),
            role: Role::Reputer,
            unmet: Unmet::StakeBelowMinimum {
                stake: Amount::new(70),
                min_stake: Amount::new(100),
            },
            tx_hash: Some("H1".to_string()),
        };
        assert_eq!(f.kind(), FailureKind::VerificationFailure);
        assert_eq!(f.tx_hash(), Some("H1"));
        assert_eq!(
            f.to_string(),
            "reputer topic=3: stake 70 still below minimum 100 after successful submission (tx_hash=H1)"
        );
    }

    #[test]
    fn read_failure_display_distinguishes_verifying_reads() {
        let f = ReconcileFailure::ReadFailure {
            topic_id: TopicId(1),
            role: Role::Worker,
            query: LedgerQuery::Registration,
            after_write: true,
            error: LedgerError::Transport("timeout".to_string()),
        };
        assert_eq!(
            f.to_string(),
            "worker topic=1: verifying registration read failed: transport error: timeout"
        );
    }

    #[test]
    fn reputer_config_deserializes_string_or_number_stake() {
        let a: ReputerConfig =
            serde_json::from_str(r#"{"topic_id": 1, "min_stake": "100"}"#).unwrap();
        let b: ReputerConfig = serde_json::from_str(r#"{"topic_id": 1, "min_stake": 100}"#).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn convergence_wrote_tracks_writes() {
        let no_write = Convergence::Reputer {
            registration: RegistrationStep::AlreadyRegistered,
            stake: StakeStep::AlreadySatisfied {
                stake: Amount::new(5),
            },
        };
        assert!(!no_write.wrote());

        let topped = Convergence::Reputer {
            registration: RegistrationStep::AlreadyRegistered,
            stake: StakeStep::ToppedUp {
                added: Amount::new(1),
                stake: Amount::new(6),
                tx_hash: None,
            },
        };
        assert!(topped.wrote());
    }
}
