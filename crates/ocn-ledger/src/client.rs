//! Collaborator traits consumed by the reconciliation engine.
//!
//! Both traits are `Send + Sync` so one client can be shared across tasks
//! reconciling many topics at once. Implementations own transport concerns
//! (timeouts, TLS, connection pooling); the engine only sees `Result`s.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    AddStakeMsg, Address, Amount, ChainParams, LedgerError, RegisterMsg, Role, SubmitError,
    TopicId, TxResult,
};

/// Read-only ledger queries. No mutation, no retry policy of its own.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    async fn is_registered(
        &self,
        topic_id: TopicId,
        role: Role,
        address: &Address,
    ) -> Result<bool, LedgerError>;

    async fn chain_params(&self) -> Result<ChainParams, LedgerError>;

    async fn balance(&self, address: &Address) -> Result<Amount, LedgerError>;

    async fn stake(&self, topic_id: TopicId, address: &Address) -> Result<Amount, LedgerError>;
}

/// Signed, mutating submissions.
///
/// At-least-once: an `Err` does not prove the ledger is unchanged.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    async fn submit_register(&self, msg: &RegisterMsg) -> Result<TxResult, SubmitError>;

    /// `msg.amount` is strictly positive.
    async fn submit_add_stake(&self, msg: &AddStakeMsg) -> Result<TxResult, SubmitError>;
}

#[async_trait]
impl<T: LedgerReader + ?Sized> LedgerReader for Arc<T> {
    async fn is_registered(
        &self,
        topic_id: TopicId,
        role: Role,
        address: &Address,
    ) -> Result<bool, LedgerError> {
        (**self).is_registered(topic_id, role, address).await
    }

    async fn chain_params(&self) -> Result<ChainParams, LedgerError> {
        (**self).chain_params().await
    }

    async fn balance(&self, address: &Address) -> Result<Amount, LedgerError> {
        (**self).balance(address).await
    }

    async fn stake(&self, topic_id: TopicId, address: &Address) -> Result<Amount, LedgerError> {
        (**self).stake(topic_id, address).await
    }
}

#[async_trait]
impl<T: LedgerWriter + ?Sized> LedgerWriter for Arc<T> {
    async fn submit_register(&self, msg: &RegisterMsg) -> Result<TxResult, SubmitError> {
        (**self).submit_register(msg).await
    }

    async fn submit_add_stake(&self, msg: &AddStakeMsg) -> Result<TxResult, SubmitError> {
        (**self).submit_add_stake(msg).await
    }
}
