//! Deterministic in-memory "paper" ledger.
//!
//! Design decisions (kept simple/deterministic):
//! - `tx_hash` is a stable sequence string: `"paper:tx:{n}"`, n starting at 1.
//! - Registration charges `registration_fee` from the owner's balance.
//!   Registering an already-registered (topic, role, owner) is a no-op that
//!   still succeeds and charges nothing.
//! - Add-stake moves `amount` from the sender's balance to its topic stake.
//! - Underfunded or zero-amount requests are rejected and change nothing.
//! - No randomness. No timestamps. No lag: writes are visible immediately.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    AddStakeMsg, Address, Amount, ChainParams, LedgerError, LedgerReader, LedgerWriter,
    RegisterMsg, Role, SubmitError, TopicId, TxResult,
};

#[derive(Debug)]
struct PaperState {
    params: ChainParams,
    balances: BTreeMap<Address, Amount>,
    registrations: BTreeSet<(TopicId, Role, Address)>,
    stakes: BTreeMap<(TopicId, Address), Amount>,
    tx_seq: u64,
}

impl PaperState {
    fn next_tx_hash(&mut self) -> String {
        self.tx_seq += 1;
        format!("paper:tx:{}", self.tx_seq)
    }

    fn balance_of(&self, address: &Address) -> Amount {
        self.balances.get(address).copied().unwrap_or(Amount::ZERO)
    }
}

#[derive(Debug)]
pub struct PaperLedger {
    state: Mutex<PaperState>,
}

impl PaperLedger {
    pub fn new(registration_fee: Amount) -> Self {
        Self {
            state: Mutex::new(PaperState {
                params: ChainParams { registration_fee },
                balances: BTreeMap::new(),
                registrations: BTreeSet::new(),
                stakes: BTreeMap::new(),
                tx_seq: 0,
            }),
        }
    }

    /// Set an address's spendable balance (test / scenario setup).
    pub async fn fund(&self, address: &Address, amount: Amount) {
        self.state
            .lock()
            .await
            .balances
            .insert(address.clone(), amount);
    }

    pub async fn set_registration_fee(&self, fee: Amount) {
        self.state.lock().await.params.registration_fee = fee;
    }

    /// Mark a registration as already present, without charging a fee.
    pub async fn preregister(&self, topic_id: TopicId, role: Role, address: &Address) {
        self.state
            .lock()
            .await
            .registrations
            .insert((topic_id, role, address.clone()));
    }

    pub async fn set_stake(&self, topic_id: TopicId, address: &Address, amount: Amount) {
        self.state
            .lock()
            .await
            .stakes
            .insert((topic_id, address.clone()), amount);
    }

    /// Number of transactions accepted so far.
    pub async fn tx_count(&self) -> u64 {
        self.state.lock().await.tx_seq
    }
}

#[async_trait]
impl LedgerReader for PaperLedger {
    async fn is_registered(
        &self,
        topic_id: TopicId,
        role: Role,
        address: &Address,
    ) -> Result<bool, LedgerError> {
        let st = self.state.lock().await;
        Ok(st
            .registrations
            .contains(&(topic_id, role, address.clone())))
    }

    async fn chain_params(&self) -> Result<ChainParams, LedgerError> {
        Ok(self.state.lock().await.params.clone())
    }

    async fn balance(&self, address: &Address) -> Result<Amount, LedgerError> {
        Ok(self.state.lock().await.balance_of(address))
    }

    async fn stake(&self, topic_id: TopicId, address: &Address) -> Result<Amount, LedgerError> {
        let st = self.state.lock().await;
        Ok(st
            .stakes
            .get(&(topic_id, address.clone()))
            .copied()
            .unwrap_or(Amount::ZERO))
    }
}

#[async_trait]
impl LedgerWriter for PaperLedger {
    async fn submit_register(&self, msg: &RegisterMsg) -> Result<TxResult, SubmitError> {
        let mut st = self.state.lock().await;
        let key = (msg.topic_id, msg.role, msg.owner.clone());

        if st.registrations.contains(&key) {
            let tx_hash = st.next_tx_hash();
            return Ok(TxResult {
                tx_hash,
                success: true,
            });
        }

        let fee = st.params.registration_fee;
        let remaining = st.balance_of(&msg.sender).checked_sub(fee).ok_or_else(|| {
            SubmitError::rejected(format!(
                "insufficient funds: fee {fee} exceeds balance of {}",
                msg.sender
            ))
        })?;

        st.balances.insert(msg.sender.clone(), remaining);
        st.registrations.insert(key);
        let tx_hash = st.next_tx_hash();
        Ok(TxResult {
            tx_hash,
            success: true,
        })
    }

    async fn submit_add_stake(&self, msg: &AddStakeMsg) -> Result<TxResult, SubmitError> {
        if msg.amount.is_zero() {
            return Err(SubmitError::rejected("add stake amount must be positive"));
        }

        let mut st = self.state.lock().await;
        let remaining = st
            .balance_of(&msg.sender)
            .checked_sub(msg.amount)
            .ok_or_else(|| {
                SubmitError::rejected(format!(
                    "insufficient funds: stake {} exceeds balance of {}",
                    msg.amount, msg.sender
                ))
            })?;

        let stake_key = (msg.topic_id, msg.sender.clone());
        let current = st.stakes.get(&stake_key).copied().unwrap_or(Amount::ZERO);
        let updated = current
            .checked_add(msg.amount)
            .ok_or_else(|| SubmitError::rejected("stake overflow"))?;

        st.balances.insert(msg.sender.clone(), remaining);
        st.stakes.insert(stake_key, updated);
        let tx_hash = st.next_tx_hash();
        Ok(TxResult {
            tx_hash,
            success: true,
        })
    }
}
