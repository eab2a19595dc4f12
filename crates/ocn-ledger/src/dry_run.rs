use async_trait::async_trait;
use tracing::info;

use crate::{AddStakeMsg, LedgerMsg, LedgerWriter, RegisterMsg, SubmitError, TxResult};

/// Writer used when the wallet is configured with `submit_tx = false`.
///
/// Nothing is broadcast. Every submission is logged and reported as rejected,
/// so the post-write read correctly reports the tuple as not converged.
#[derive(Clone, Debug, Default)]
pub struct DryRunWriter;

impl DryRunWriter {
    pub fn new() -> Self {
        Self
    }

    fn skip(&self, msg: LedgerMsg) -> Result<TxResult, SubmitError> {
        let payload = serde_json::to_string(&msg).unwrap_or_default();
        info!(msg = %msg.describe(), payload = %payload, "submit_tx=false, not broadcasting");
        Err(SubmitError::rejected("dry run: submission disabled"))
    }
}

#[async_trait]
impl LedgerWriter for DryRunWriter {
    async fn submit_register(&self, msg: &RegisterMsg) -> Result<TxResult, SubmitError> {
        self.skip(LedgerMsg::Register(msg.clone()))
    }

    async fn submit_add_stake(&self, msg: &AddStakeMsg) -> Result<TxResult, SubmitError> {
        self.skip(LedgerMsg::AddStake(msg.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Address, Role, TopicId};

    #[tokio::test]
    async fn dry_run_never_reports_success() {
        let w = DryRunWriter::new();
        let msg = RegisterMsg::for_identity(&Address::new("allo1node"), TopicId(2), Role::Worker);
        let err = w.submit_register(&msg).await.unwrap_err();
        assert!(!err.is_transient());
        assert!(err.tx_hash.is_none());
    }
}
