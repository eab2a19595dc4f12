//! `ocn reconcile`: one pass over every configured (role, topic) tuple.
//!
//! Stdout carries the report (key=value lines, or one JSON document with
//! `--json`); logs go to stderr. Any non-converged tuple makes the command
//! fail so schedulers and shells see a non-zero exit.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use ocn_config::NodeConfig;
use ocn_ledger::{
    Amount, DryRunWriter, LedgerReader, LedgerWriter, PaperLedger, RetryingWriter,
};
use ocn_ledger_rest::{RestLedger, RestLedgerConfig};
use ocn_reconcile::{reconcile_all, PassReport, Reconciler};
use serde::Serialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::load_node_config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerMode {
    Live,
    Paper {
        balance: Amount,
        registration_fee: Amount,
    },
}

impl LedgerMode {
    fn as_str(&self) -> &'static str {
        match self {
            LedgerMode::Live => "live",
            LedgerMode::Paper { .. } => "paper",
        }
    }
}

#[derive(Debug, Serialize)]
struct PassEnvelope<'a> {
    pass_id: String,
    mode: &'static str,
    config_hash: &'a str,
    address: String,
    started_at_utc: DateTime<Utc>,
    finished_at_utc: DateTime<Utc>,
    all_converged: bool,
    report: &'a PassReport,
}

struct Ledger {
    reader: Arc<dyn LedgerReader>,
    writer: Arc<dyn LedgerWriter>,
    paper: Option<Arc<PaperLedger>>,
}

fn build_ledger(cfg: &NodeConfig, mode: LedgerMode) -> Result<Ledger> {
    match mode {
        LedgerMode::Paper { registration_fee, .. } => {
            let paper = Arc::new(PaperLedger::new(registration_fee));
            let writer: Arc<dyn LedgerWriter> = if cfg.wallet.submit_tx {
                paper.clone()
            } else {
                Arc::new(DryRunWriter::new())
            };
            Ok(Ledger {
                reader: paper.clone(),
                writer,
                paper: Some(paper),
            })
        }
        LedgerMode::Live => {
            // The relay holds the signing key; this process only names the sender.
            info!(
                rest_url = %cfg.ledger.rest_url,
                relay_url = %cfg.ledger.relay_url,
                submit_tx = cfg.wallet.submit_tx,
                "live ledger"
            );

            let rest = Arc::new(
                RestLedger::new(RestLedgerConfig {
                    rest_url: cfg.ledger.rest_url.clone(),
                    relay_url: cfg.ledger.relay_url.clone(),
                    api_version: cfg.ledger.api_version.clone(),
                    denom: cfg.ledger.denom.clone(),
                    request_timeout: cfg.ledger.request_timeout(),
                })
                .context("failed to build ledger http client")?,
            );
            let writer: Arc<dyn LedgerWriter> = if cfg.wallet.submit_tx {
                Arc::new(RetryingWriter::new(rest.clone(), cfg.retry.policy()))
            } else {
                Arc::new(DryRunWriter::new())
            };
            Ok(Ledger {
                reader: rest,
                writer,
                paper: None,
            })
        }
    }
}

pub async fn reconcile(config_paths: &[String], mode: LedgerMode, json: bool) -> Result<()> {
    let (loaded, cfg, origin) = load_node_config(config_paths)?;
    let identity = cfg.identity();

    let ledger = build_ledger(&cfg, mode)?;
    if let (Some(paper), LedgerMode::Paper { balance, .. }) = (&ledger.paper, mode) {
        paper.fund(&identity, balance).await;
    }

    let pass_id = Uuid::new_v4().to_string();
    let span = info_span!(
        "pass",
        pass_id = %pass_id,
        config_hash = %loaded.config_hash,
        mode = mode.as_str()
    );

    let started_at_utc = Utc::now();
    let reconciler = Reconciler::new(identity.clone(), ledger.reader, ledger.writer);
    let report = async {
        info!(
            config_source = %origin,
            address = %identity,
            workers = cfg.worker.len(),
            reputers = cfg.reputer.len(),
            "pass started"
        );
        let report = reconcile_all(&reconciler, &cfg.worker, &cfg.reputer).await;
        info!(
            converged = report.converged_count(),
            total = report.outcomes.len(),
            "pass finished"
        );
        report
    }
    .instrument(span)
    .await;
    let finished_at_utc = Utc::now();

    if json {
        let envelope = PassEnvelope {
            pass_id: pass_id.clone(),
            mode: mode.as_str(),
            config_hash: &loaded.config_hash,
            address: identity.to_string(),
            started_at_utc,
            finished_at_utc,
            all_converged: report.all_converged(),
            report: &report,
        };
        let out = serde_json::to_string_pretty(&envelope).context("serialize pass report failed")?;
        println!("{}", out);
    } else {
        println!("pass_id={}", pass_id);
        println!("mode={}", mode.as_str());
        println!("config_hash={}", loaded.config_hash);
        println!("address={}", identity);
        for o in &report.outcomes {
            let mut line = format!(
                "tuple role={} topic_id={} converged={}",
                o.role, o.topic_id, o.converged
            );
            if let Some(wrote) = o.wrote {
                line.push_str(&format!(" wrote={}", wrote));
            }
            if let Some(kind) = o.failure {
                line.push_str(&format!(" failure={}", kind.as_str()));
            }
            println!("{}", line);
        }
        if let Some(paper) = &ledger.paper {
            println!("paper_tx_count={}", paper.tx_count().await);
        }
        println!(
            "converged={}/{}",
            report.converged_count(),
            report.outcomes.len()
        );
    }

    if !report.all_converged() {
        let failed: Vec<String> = report
            .failed()
            .map(|o| format!("{}/{}", o.role, o.topic_id))
            .collect();
        bail!(
            "NOT_CONVERGED: {} of {} tuple(s) did not converge: {}",
            failed.len(),
            report.outcomes.len(),
            failed.join(", ")
        );
    }

    Ok(())
}
