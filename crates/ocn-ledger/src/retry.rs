//! At-least-once submission with bounded exponential backoff.
//!
//! Only [`SubmitErrorKind::Transient`](crate::SubmitErrorKind) errors are
//! retried. A rejected request or a broadcast that returned a `TxResult`
//! (successful or not) ends the loop. Submission is never made exactly-once
//! here; callers re-verify ledger state after the call returns.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::{AddStakeMsg, LedgerMsg, LedgerWriter, RegisterMsg, SubmitError, TxResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Values below 1 behave as 1.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            multiplier: 2,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that performs exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-based): `initial * multiplier^retry`,
    /// capped at `max_delay`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(retry);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Wraps any [`LedgerWriter`] with [`RetryPolicy`].
pub struct RetryingWriter<W> {
    inner: W,
    policy: RetryPolicy,
}

impl<W: LedgerWriter> RetryingWriter<W> {
    pub fn new(inner: W, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }

    async fn run<F, Fut>(&self, label: &str, op: F) -> Result<TxResult, SubmitError>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<TxResult, SubmitError>> + Send,
    {
        let attempts = self.policy.attempts();
        let mut last_tx_hash: Option<String> = None;
        let mut attempt: u32 = 1;

        loop {
            let err = match op().await {
                Ok(res) => return Ok(res),
                Err(err) => err,
            };

            if let Some(h) = &err.tx_hash {
                last_tx_hash = Some(h.clone());
            }

            if !err.is_transient() || attempt >= attempts {
                let mut err = err;
                if err.tx_hash.is_none() {
                    err.tx_hash = last_tx_hash;
                }
                return Err(err);
            }

            let delay = self.policy.delay_for(attempt - 1);
            warn!(
                msg = label,
                attempt,
                max_attempts = attempts,
                delay_ms = whole_millis(delay),
                error = %err,
                "transient submission failure, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Milliseconds for logging, saturating at `u64::MAX`.
fn whole_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl<W: LedgerWriter> LedgerWriter for RetryingWriter<W> {
    async fn submit_register(&self, msg: &RegisterMsg) -> Result<TxResult, SubmitError> {
        let label = LedgerMsg::Register(msg.clone()).describe();
        self.run(&label, || self.inner.submit_register(msg)).await
    }

    async fn submit_add_stake(&self, msg: &AddStakeMsg) -> Result<TxResult, SubmitError> {
        let label = LedgerMsg::AddStake(msg.clone()).describe();
        self.run(&label, || self.inner.submit_add_stake(msg)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Address, Amount, Role, TopicId};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed script of submit results and counts calls.
    struct ScriptedWriter {
        script: Mutex<VecDeque<Result<TxResult, SubmitError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedWriter {
        fn new(script: Vec<Result<TxResult, SubmitError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }

        fn next(&self) -> Result<TxResult, SubmitError> {
            *self.calls.lock().unwrap() += 1;
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(SubmitError::rejected("script exhausted")))
        }
    }

    #[async_trait]
    impl LedgerWriter for ScriptedWriter {
        async fn submit_register(&self, _msg: &RegisterMsg) -> Result<TxResult, SubmitError> {
            self.next()
        }

        async fn submit_add_stake(&self, _msg: &AddStakeMsg) -> Result<TxResult, SubmitError> {
            self.next()
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            multiplier: 2,
            max_delay: Duration::from_millis(4),
        }
    }

    fn register_msg() -> RegisterMsg {
        RegisterMsg::for_identity(&Address::new("allo1node"), TopicId(1), Role::Worker)
    }

    fn ok(hash: &str) -> Result<TxResult, SubmitError> {
        Ok(TxResult {
            tx_hash: hash.to_string(),
            success: true,
        })
    }

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let p = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_millis(100),
            multiplier: 3,
            max_delay: Duration::from_millis(1000),
        };
        assert_eq!(p.delay_for(0), Duration::from_millis(100));
        assert_eq!(p.delay_for(1), Duration::from_millis(300));
        assert_eq!(p.delay_for(2), Duration::from_millis(900));
        assert_eq!(p.delay_for(3), Duration::from_millis(1000));
        assert_eq!(p.delay_for(40), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let w = RetryingWriter::new(
            ScriptedWriter::new(vec![
                Err(SubmitError::transient("timeout")),
                Err(SubmitError::transient("connection reset")),
                ok("H3"),
            ]),
            fast_policy(5),
        );

        let res = w.submit_register(&register_msg()).await.unwrap();
        assert_eq!(res.tx_hash, "H3");
        assert_eq!(w.inner().calls(), 3);
    }

    #[tokio::test]
    async fn rejected_error_is_not_retried() {
        let w = RetryingWriter::new(
            ScriptedWriter::new(vec![Err(SubmitError::rejected("bad sequence")), ok("H2")]),
            fast_policy(5),
        );

        let err = w.submit_register(&register_msg()).await.unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(w.inner().calls(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts_and_keeps_last_known_hash() {
        let w = RetryingWriter::new(
            ScriptedWriter::new(vec![
                Err(SubmitError::transient("timeout after broadcast").with_tx_hash("H1")),
                Err(SubmitError::transient("timeout")),
                Err(SubmitError::transient("timeout")),
                ok("never reached"),
            ]),
            fast_policy(3),
        );

        let msg = AddStakeMsg {
            sender: Address::new("allo1node"),
            topic_id: TopicId(1),
            amount: Amount::new(10),
        };
        let err = w.submit_add_stake(&msg).await.unwrap_err();
        assert_eq!(w.inner().calls(), 3);
        assert_eq!(err.tx_hash.as_deref(), Some("H1"));
    }

    #[tokio::test]
    async fn unsuccessful_tx_result_is_returned_as_is() {
        let w = RetryingWriter::new(
            ScriptedWriter::new(vec![Ok(TxResult {
                tx_hash: "H1".to_string(),
                success: false,
            })]),
            fast_policy(5),
        );

        let res = w.submit_register(&register_msg()).await.unwrap();
        assert!(!res.success);
        assert_eq!(w.inner().calls(), 1);
    }

    #[tokio::test]
    async fn zero_max_attempts_still_makes_one_attempt() {
        let w = RetryingWriter::new(
            ScriptedWriter::new(vec![Err(SubmitError::transient("timeout"))]),
            fast_policy(0),
        );
        assert!(w.submit_register(&register_msg()).await.is_err());
        assert_eq!(w.inner().calls(), 1);
    }

    #[test]
    fn logged_delay_saturates_instead_of_wrapping() {
        assert_eq!(whole_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(whole_millis(Duration::MAX), u64::MAX);
    }
}
