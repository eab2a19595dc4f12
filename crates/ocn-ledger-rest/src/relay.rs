//! Signing relay client.
//!
//! `POST {relay}/v1/tx/broadcast` with a tagged [`LedgerMsg`] body. A 2xx
//! answer carries the broadcast result; `code == 0` means the transaction
//! was accepted. HTTP failures are classified for the retry wrapper.

use async_trait::async_trait;
use ocn_ledger::{
    AddStakeMsg, LedgerMsg, LedgerWriter, RegisterMsg, SubmitError, SubmitErrorKind, TxResult,
};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{truncate, RestLedger};

#[derive(Debug, Deserialize)]
struct BroadcastResponse {
    tx_hash: String,
    #[serde(default)]
    code: u32,
    #[serde(default)]
    raw_log: String,
}

/// Error bodies are best-effort; a relay may still know the hash it sent.
#[derive(Debug, Default, Deserialize)]
struct RelayErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    tx_hash: Option<String>,
}

/// 5xx and 429 are worth retrying; any other non-2xx is final.
pub fn classify_status(status: StatusCode) -> SubmitErrorKind {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        SubmitErrorKind::Transient
    } else {
        SubmitErrorKind::Rejected
    }
}

impl RestLedger {
    async fn broadcast(&self, msg: LedgerMsg) -> Result<TxResult, SubmitError> {
        let url = self.broadcast_url();
        debug!(msg = %msg.describe(), url = %url, "broadcasting");

        let resp = self
            .http
            .post(&url)
            .json(&msg)
            .send()
            .await
            // Timeouts land here too: the request may still have been applied.
            .map_err(|e| SubmitError::transient(format!("POST {url}: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| SubmitError::transient(format!("POST {url}: body read failed: {e}")))?;

        if !status.is_success() {
            let parsed: RelayErrorBody = serde_json::from_str(&body).unwrap_or_default();
            let detail = parsed.error.unwrap_or_else(|| truncate(&body, 256));
            let message = format!("relay status={}: {}", status.as_u16(), detail);
            let mut err = match classify_status(status) {
                SubmitErrorKind::Transient => SubmitError::transient(message),
                SubmitErrorKind::Rejected => SubmitError::rejected(message),
            };
            if let Some(hash) = parsed.tx_hash {
                err = err.with_tx_hash(hash);
            }
            return Err(err);
        }

        let r: BroadcastResponse = serde_json::from_str(&body).map_err(|e| {
            // The relay answered 2xx, so the broadcast may have happened.
            SubmitError::transient(format!("POST {url}: undecodable response: {e}"))
        })?;

        if r.code != 0 {
            warn!(
                tx_hash = %r.tx_hash,
                code = r.code,
                raw_log = %truncate(&r.raw_log, 256),
                "broadcast returned non-zero code"
            );
        }
        Ok(TxResult {
            tx_hash: r.tx_hash,
            success: r.code == 0,
        })
    }
}

#[async_trait]
impl LedgerWriter for RestLedger {
    async fn submit_register(&self, msg: &RegisterMsg) -> Result<TxResult, SubmitError> {
        self.broadcast(LedgerMsg::Register(msg.clone())).await
    }

    async fn submit_add_stake(&self, msg: &AddStakeMsg) -> Result<TxResult, SubmitError> {
        self.broadcast(LedgerMsg::AddStake(msg.clone())).await
    }
}
