use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use ocn_ledger::{
    AddStakeMsg, Address, Amount, ChainParams, LedgerError, LedgerReader, LedgerWriter,
    RegisterMsg, Role, SubmitError, TopicId, TxResult,
};

/// One recorded call against [`FakeLedger`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerCall {
    IsRegistered { topic_id: TopicId, role: Role },
    ChainParams,
    Balance,
    Stake { topic_id: TopicId },
    SubmitRegister(RegisterMsg),
    SubmitAddStake(AddStakeMsg),
}

impl LedgerCall {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            LedgerCall::SubmitRegister(_) | LedgerCall::SubmitAddStake(_)
        )
    }
}

/// How much of a submitted stake top-up the fake ledger actually applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StakeApply {
    Full,
    /// Apply at most this much of each top-up.
    Partial(Amount),
    Nothing,
}

#[derive(Debug)]
struct FakeState {
    registered: BTreeMap<(TopicId, Role), bool>,
    registration_reads: BTreeMap<(TopicId, Role), VecDeque<Result<bool, LedgerError>>>,
    stakes: BTreeMap<TopicId, Amount>,
    stake_reads: BTreeMap<TopicId, VecDeque<Result<Amount, LedgerError>>>,
    registration_fee: Result<Amount, LedgerError>,
    balance: Result<Amount, LedgerError>,
    register_response: Option<Result<TxResult, SubmitError>>,
    register_applies: bool,
    add_stake_response: Option<Result<TxResult, SubmitError>>,
    stake_apply: StakeApply,
    calls: Vec<LedgerCall>,
    tx_seq: u64,
}

/// Scriptable in-memory ledger double.
///
/// Defaults: nothing registered, zero stake, zero balance, zero fee; every
/// submission succeeds and is applied in full.
///
/// Reads come from the fake's state unless a scripted read queue exists for
/// that key, in which case scripted values are consumed first. Submissions
/// mutate state according to `register_applies` / [`StakeApply`]
/// independently of the response they return, which is how "reported error
/// but landed" and "reported success but not visible" are simulated.
#[derive(Debug)]
pub struct FakeLedger {
    state: Mutex<FakeState>,
}

impl Default for FakeLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                registered: BTreeMap::new(),
                registration_reads: BTreeMap::new(),
                stakes: BTreeMap::new(),
                stake_reads: BTreeMap::new(),
                registration_fee: Ok(Amount::ZERO),
                balance: Ok(Amount::ZERO),
                register_response: None,
                register_applies: true,
                add_stake_response: None,
                stake_apply: StakeApply::Full,
                calls: Vec::new(),
                tx_seq: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- builders -------------------------------------------------------

    pub fn with_balance(self, balance: Amount) -> Self {
        self.state().balance = Ok(balance);
        self
    }

    pub fn with_registration_fee(self, fee: Amount) -> Self {
        self.state().registration_fee = Ok(fee);
        self
    }

    pub fn with_registered(self, topic_id: TopicId, role: Role) -> Self {
        self.state().registered.insert((topic_id, role), true);
        self
    }

    pub fn with_stake(self, topic_id: TopicId, stake: Amount) -> Self {
        self.state().stakes.insert(topic_id, stake);
        self
    }

    pub fn failing_balance(self, err: LedgerError) -> Self {
        self.state().balance = Err(err);
        self
    }

    pub fn failing_chain_params(self, err: LedgerError) -> Self {
        self.state().registration_fee = Err(err);
        self
    }

    /// Queue registration reads for (topic, role); consumed before state.
    pub fn script_registration_reads(
        self,
        topic_id: TopicId,
        role: Role,
        reads: Vec<Result<bool, LedgerError>>,
    ) -> Self {
        self.state()
            .registration_reads
            .insert((topic_id, role), reads.into());
        self
    }

    /// Queue stake reads for a topic; consumed before state.
    pub fn script_stake_reads(
        self,
        topic_id: TopicId,
        reads: Vec<Result<Amount, LedgerError>>,
    ) -> Self {
        self.state().stake_reads.insert(topic_id, reads.into());
        self
    }

    /// Response returned by every register submission (default: success).
    pub fn register_responds(self, response: Result<TxResult, SubmitError>) -> Self {
        self.state().register_response = Some(response);
        self
    }

    /// Whether a register submission becomes visible to later reads.
    pub fn register_applies(self, applies: bool) -> Self {
        self.state().register_applies = applies;
        self
    }

    /// Response returned by every add-stake submission (default: success).
    pub fn add_stake_responds(self, response: Result<TxResult, SubmitError>) -> Self {
        self.state().add_stake_response = Some(response);
        self
    }

    pub fn stake_applies(self, apply: StakeApply) -> Self {
        self.state().stake_apply = apply;
        self
    }

    // --- inspection -----------------------------------------------------

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.state().calls.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state().calls.iter().filter(|c| c.is_write()).count()
    }

    pub fn register_submissions(&self) -> Vec<RegisterMsg> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                LedgerCall::SubmitRegister(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn add_stake_submissions(&self) -> Vec<AddStakeMsg> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                LedgerCall::SubmitAddStake(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn current_stake(&self, topic_id: TopicId) -> Amount {
        self.state()
            .stakes
            .get(&topic_id)
            .copied()
            .unwrap_or(Amount::ZERO)
    }
}

impl FakeState {
    fn next_tx(&mut self) -> TxResult {
        self.tx_seq += 1;
        TxResult {
            tx_hash: format!("fake:tx:{}", self.tx_seq),
            success: true,
        }
    }
}

#[async_trait]
impl LedgerReader for FakeLedger {
    async fn is_registered(
        &self,
        topic_id: TopicId,
        role: Role,
        _address: &Address,
    ) -> Result<bool, LedgerError> {
        let mut st = self.state();
        st.calls.push(LedgerCall::IsRegistered { topic_id, role });
        if let Some(next) = st
            .registration_reads
            .get_mut(&(topic_id, role))
            .and_then(VecDeque::pop_front)
        {
            return next;
        }
        Ok(st
            .registered
            .get(&(topic_id, role))
            .copied()
            .unwrap_or(false))
    }

    async fn chain_params(&self) -> Result<ChainParams, LedgerError> {
        let mut st = self.state();
        st.calls.push(LedgerCall::ChainParams);
        st.registration_fee
            .clone()
            .map(|registration_fee| ChainParams { registration_fee })
    }

    async fn balance(&self, _address: &Address) -> Result<Amount, LedgerError> {
        let mut st = self.state();
        st.calls.push(LedgerCall::Balance);
        st.balance.clone()
    }

    async fn stake(&self, topic_id: TopicId, _address: &Address) -> Result<Amount, LedgerError> {
        let mut st = self.state();
        st.calls.push(LedgerCall::Stake { topic_id });
        if let Some(next) = st
            .stake_reads
            .get_mut(&topic_id)
            .and_then(VecDeque::pop_front)
        {
            return next;
        }
        Ok(st.stakes.get(&topic_id).copied().unwrap_or(Amount::ZERO))
    }
}

#[async_trait]
impl LedgerWriter for FakeLedger {
    async fn submit_register(&self, msg: &RegisterMsg) -> Result<TxResult, SubmitError> {
        let mut st = self.state();
        st.calls.push(LedgerCall::SubmitRegister(msg.clone()));
        if st.register_applies {
            st.registered.insert((msg.topic_id, msg.role), true);
        }
        match st.register_response.clone() {
            Some(response) => response,
            None => Ok(st.next_tx()),
        }
    }

    async fn submit_add_stake(&self, msg: &AddStakeMsg) -> Result<TxResult, SubmitError> {
        let mut st = self.state();
        st.calls.push(LedgerCall::SubmitAddStake(msg.clone()));
        let applied = match st.stake_apply {
            StakeApply::Full => msg.amount,
            StakeApply::Partial(cap) => msg.amount.min(cap),
            StakeApply::Nothing => Amount::ZERO,
        };
        let current = st.stakes.get(&msg.topic_id).copied().unwrap_or(Amount::ZERO);
        let updated = current.checked_add(applied).unwrap_or(current);
        st.stakes.insert(msg.topic_id, updated);
        match st.add_stake_response.clone() {
            Some(response) => response,
            None => Ok(st.next_tx()),
        }
    }
}
