//! ocn-ledger-rest
//!
//! HTTP implementation of the ledger boundary.
//!
//! - Reads go to the chain's REST query gateway. Integers arrive as decimal
//!   strings.
//! - Writes go to a signing relay that holds the node key, signs, broadcasts,
//!   and answers with `{ tx_hash, code, raw_log }`.
//!
//! Base URLs are passed in by the caller; nothing here reads the environment.

use std::time::Duration;

use ocn_ledger::LedgerError;

mod query;
mod relay;

pub use relay::classify_status;

/// Connection settings for [`RestLedger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestLedgerConfig {
    pub rest_url: String,
    pub relay_url: String,
    /// Emissions module API version segment, e.g. `"v9"`.
    pub api_version: String,
    pub denom: String,
    pub request_timeout: Duration,
}

/// REST gateway reader + signing relay writer.
#[derive(Debug, Clone)]
pub struct RestLedger {
    http: reqwest::Client,
    cfg: RestLedgerConfig,
}

impl RestLedger {
    pub fn new(cfg: RestLedgerConfig) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .map_err(|e| LedgerError::Transport(format!("http client build failed: {e}")))?;
        Ok(Self { http, cfg })
    }

    pub fn config(&self) -> &RestLedgerConfig {
        &self.cfg
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.rest_url.trim_end_matches('/'), path)
    }

    fn emissions_url(&self, path: &str) -> String {
        self.rest_url(&format!("/emissions/{}{}", self.cfg.api_version, path))
    }

    fn broadcast_url(&self) -> String {
        format!("{}/v1/tx/broadcast", self.cfg.relay_url.trim_end_matches('/'))
    }
}

/// Keep error bodies short in logs and messages.
fn truncate(s: &str, max: usize) -> String {
    let t = s.trim();
    if t.len() <= max {
        return t.to_string();
    }
    let mut end = max;
    while !t.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &t[..end])
}
