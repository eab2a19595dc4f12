//! Scenario: Worker Registration
//!
//! # Invariants under test
//!
//! 1. Already registered => `true`, no chain-params/balance reads, no write.
//! 2. Repeating the call on a registered identity issues zero writes both times.
//! 3. Balance == fee => exactly one register call, re-read confirms => `true`.
//! 4. Balance < fee => no register call => `false` (InsufficientFunds).
//! 5. A failing status / chain-params / balance read => `false`, no write.
//! 6. The register message is for the identity itself, with role=worker.
//!
//! All tests run against `FakeLedger`; no network required.

use std::sync::Arc;

use ocn_ledger::{Address, Amount, LedgerError, RegisterMsg, Role, TopicId};
use ocn_reconcile::{
    Convergence, FailureKind, LedgerQuery, ReconcileFailure, Reconciler, RegistrationStep,
    WorkerConfig,
};
use ocn_testkit::{FakeLedger, LedgerCall};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const TOPIC: TopicId = TopicId(7);

fn node() -> Address {
    Address::new("allo1workernode")
}

fn engine(ledger: &Arc<FakeLedger>) -> Reconciler<Arc<FakeLedger>, Arc<FakeLedger>> {
    Reconciler::new(node(), ledger.clone(), ledger.clone())
}

fn worker() -> WorkerConfig {
    WorkerConfig { topic_id: TOPIC }
}

// ---------------------------------------------------------------------------
// 1-2. Idempotence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn already_registered_worker_is_converged_without_writes() {
    let ledger = Arc::new(FakeLedger::new().with_registered(TOPIC, Role::Worker));
    let engine = engine(&ledger);

    assert!(engine.reconcile_worker_registration(&worker()).await);
    assert_eq!(
        ledger.calls(),
        vec![LedgerCall::IsRegistered {
            topic_id: TOPIC,
            role: Role::Worker
        }],
        "registered identity must cost exactly one read"
    );
}

#[tokio::test]
async fn repeated_calls_on_registered_worker_never_write() {
    let ledger = Arc::new(FakeLedger::new().with_registered(TOPIC, Role::Worker));
    let engine = engine(&ledger);

    assert!(engine.reconcile_worker_registration(&worker()).await);
    assert!(engine.reconcile_worker_registration(&worker()).await);
    assert_eq!(ledger.write_count(), 0);
}

#[tokio::test]
async fn second_pass_after_registering_issues_no_write() {
    let ledger = Arc::new(
        FakeLedger::new()
            .with_balance(Amount::new(100))
            .with_registration_fee(Amount::new(100)),
    );
    let engine = engine(&ledger);

    assert!(engine.reconcile_worker_registration(&worker()).await);
    assert_eq!(ledger.write_count(), 1);

    ledger.clear_calls();
    let second = engine
        .try_reconcile_worker_registration(&worker())
        .await
        .expect("second pass converges");
    assert_eq!(
        second,
        Convergence::Worker {
            registration: RegistrationStep::AlreadyRegistered
        }
    );
    assert_eq!(ledger.write_count(), 0);
}

// ---------------------------------------------------------------------------
// 3-4. Funding precondition
// ---------------------------------------------------------------------------

#[tokio::test]
async fn balance_equal_to_fee_registers_and_verifies() {
    let ledger = Arc::new(
        FakeLedger::new()
            .with_balance(Amount::new(100))
            .with_registration_fee(Amount::new(100)),
    );
    let engine = engine(&ledger);

    let out = engine
        .try_reconcile_worker_registration(&worker())
        .await
        .expect("converges");
    assert!(out.wrote());
    assert_eq!(
        ledger.calls(),
        vec![
            LedgerCall::IsRegistered {
                topic_id: TOPIC,
                role: Role::Worker
            },
            LedgerCall::ChainParams,
            LedgerCall::Balance,
            LedgerCall::SubmitRegister(RegisterMsg::for_identity(&node(), TOPIC, Role::Worker)),
            LedgerCall::IsRegistered {
                topic_id: TOPIC,
                role: Role::Worker
            },
        ],
        "read, check funds, write once, re-read"
    );
}

#[tokio::test]
async fn balance_below_fee_never_submits() {
    let ledger = Arc::new(
        FakeLedger::new()
            .with_balance(Amount::new(99))
            .with_registration_fee(Amount::new(100)),
    );
    let engine = engine(&ledger);

    assert!(!engine.reconcile_worker_registration(&worker()).await);
    assert!(ledger.register_submissions().is_empty());

    let err = engine
        .try_reconcile_worker_registration(&worker())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ReconcileFailure::InsufficientFunds {
            topic_id: TOPIC,
            role: Role::Worker,
            balance: Amount::new(99),
            registration_fee: Amount::new(100),
        }
    );
    assert_eq!(ledger.write_count(), 0);
}

#[tokio::test]
async fn underfunded_for_any_shortfall() {
    for balance in [0u64, 1, 50, 999] {
        let ledger = Arc::new(
            FakeLedger::new()
                .with_balance(Amount::from(balance))
                .with_registration_fee(Amount::new(1_000)),
        );
        assert!(
            !engine(&ledger).reconcile_worker_registration(&worker()).await,
            "balance {balance} < fee must not converge"
        );
        assert_eq!(ledger.write_count(), 0, "balance {balance}: no write");
    }
}

// ---------------------------------------------------------------------------
// 5. Read failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_read_failure_is_not_converged_and_writes_nothing() {
    let ledger = Arc::new(
        FakeLedger::new()
            .with_balance(Amount::new(1_000))
            .script_registration_reads(
                TOPIC,
                Role::Worker,
                vec![Err(LedgerError::Transport("connection refused".to_string()))],
            ),
    );
    let engine = engine(&ledger);

    let err = engine
        .try_reconcile_worker_registration(&worker())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::ReadFailure);
    assert!(matches!(
        err,
        ReconcileFailure::ReadFailure {
            query: LedgerQuery::Registration,
            after_write: false,
            ..
        }
    ));
    assert_eq!(ledger.write_count(), 0);
}

#[tokio::test]
async fn chain_params_read_failure_aborts_before_balance() {
    let ledger = Arc::new(
        FakeLedger::new()
            .with_balance(Amount::new(1_000))
            .failing_chain_params(LedgerError::Api {
                status: Some(503),
                message: "unavailable".to_string(),
            }),
    );

    assert!(!engine(&ledger).reconcile_worker_registration(&worker()).await);
    assert!(!ledger.calls().contains(&LedgerCall::Balance));
    assert_eq!(ledger.write_count(), 0);
}

#[tokio::test]
async fn balance_read_failure_aborts_without_write() {
    let ledger = Arc::new(
        FakeLedger::new().failing_balance(LedgerError::Decode("bad amount".to_string())),
    );

    let err = engine(&ledger)
        .try_reconcile_worker_registration(&worker())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReconcileFailure::ReadFailure {
            query: LedgerQuery::Balance,
            ..
        }
    ));
    assert_eq!(ledger.write_count(), 0);
}

// ---------------------------------------------------------------------------
// 6. Message shape
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_message_is_signed_and_owned_by_identity() {
    let ledger = Arc::new(FakeLedger::new());
    assert!(engine(&ledger).reconcile_worker_registration(&worker()).await);

    let sent = ledger.register_submissions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].sender, node());
    assert_eq!(sent[0].owner, node());
    assert_eq!(sent[0].role, Role::Worker);
    assert_eq!(sent[0].topic_id, TOPIC);
}
