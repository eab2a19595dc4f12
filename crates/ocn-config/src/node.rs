//! Typed node configuration.
//!
//! Parsed from the merged config JSON (see [`crate::LoadedConfig`]). Every
//! section rejects unknown keys so a typo fails loudly instead of silently
//! falling back to a default.

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use ocn_ledger::{Address, RetryPolicy, TopicId};
use ocn_reconcile::{ReputerConfig, WorkerConfig};
use serde::{Deserialize, Serialize};

use crate::LoadedConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    pub wallet: WalletConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub worker: Vec<WorkerConfig>,
    #[serde(default)]
    pub reputer: Vec<ReputerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WalletConfig {
    /// Sender and owner of every submitted message. Signing happens in the
    /// relay, so no key material is configured here.
    pub address: String,
    /// `false` => log what would be broadcast, broadcast nothing.
    #[serde(default = "default_true")]
    pub submit_tx: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LedgerConfig {
    pub rest_url: String,
    pub relay_url: String,
    pub api_version: String,
    pub denom: String,
    pub request_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rest_url: "http://localhost:1317".to_string(),
            relay_url: "http://localhost:8787".to_string(),
            api_version: "v9".to_string(),
            denom: "uallo".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

impl LedgerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub multiplier: u32,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let p = RetryPolicy::default();
        Self {
            max_attempts: p.max_attempts,
            initial_delay_ms: duration_ms(p.initial_delay),
            multiplier: p.multiplier,
            max_delay_ms: duration_ms(p.max_delay),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            multiplier: self.multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn default_true() -> bool {
    true
}

impl NodeConfig {
    /// Parse and validate the typed config out of a loaded document.
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        let cfg: NodeConfig = serde_json::from_value(loaded.config_json.clone())
            .context("CONFIG_INVALID: config does not match the node schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn identity(&self) -> Address {
        Address::new(self.wallet.address.trim())
    }

    pub fn validate(&self) -> Result<()> {
        if self.wallet.address.trim().is_empty() {
            bail!("CONFIG_INVALID: wallet.address must not be empty");
        }
        if self.worker.is_empty() && self.reputer.is_empty() {
            bail!("CONFIG_INVALID: no worker or reputer configured");
        }

        check_topics("worker", self.worker.iter().map(|w| w.topic_id))?;
        check_topics("reputer", self.reputer.iter().map(|r| r.topic_id))?;

        if self.ledger.rest_url.trim().is_empty() {
            bail!("CONFIG_INVALID: ledger.rest_url must not be empty");
        }
        if self.wallet.submit_tx && self.ledger.relay_url.trim().is_empty() {
            bail!("CONFIG_INVALID: ledger.relay_url is required when wallet.submit_tx=true");
        }
        if self.ledger.request_timeout_ms == 0 {
            bail!("CONFIG_INVALID: ledger.request_timeout_ms must be > 0");
        }
        if self.retry.max_attempts < 1 {
            bail!("CONFIG_INVALID: retry.max_attempts must be >= 1");
        }
        if self.retry.multiplier < 1 {
            bail!("CONFIG_INVALID: retry.multiplier must be >= 1");
        }
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            bail!(
                "CONFIG_INVALID: retry.initial_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.initial_delay_ms,
                self.retry.max_delay_ms
            );
        }
        Ok(())
    }
}

fn check_topics(role: &str, topics: impl Iterator<Item = TopicId>) -> Result<()> {
    let mut seen = BTreeSet::new();
    for topic_id in topics {
        if topic_id.get() == 0 {
            bail!("CONFIG_INVALID: {role} topic_id must be > 0");
        }
        if !seen.insert(topic_id) {
            bail!("CONFIG_INVALID: duplicate {role} entry for topic_id={topic_id}");
        }
    }
    Ok(())
}
