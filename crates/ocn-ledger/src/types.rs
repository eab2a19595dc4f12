use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Identity / partitioning
// ---------------------------------------------------------------------------

/// On-ledger address of the node. Immutable for the process lifetime.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque numeric topic identifier. Registration and stake are scoped per topic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(pub u64);

impl TopicId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registration is role-scoped: the same address may be registered as worker
/// and as reputer on the same topic independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Worker,
    Reputer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Worker => "worker",
            Role::Reputer => "reputer",
        }
    }

    pub fn is_reputer(&self) -> bool {
        matches!(self, Role::Reputer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// Non-negative integer amount in base units.
///
/// Ledger integers routinely exceed 64 bits, so the wire form is a decimal
/// string. Deserialization also accepts a plain integer (handy in YAML).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn new(base_units: u128) -> Self {
        Self(base_units)
    }

    pub fn get(self) -> u128 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// `None` when `rhs > self` (the result would be negative).
    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    pub fn saturating_sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }
}

impl From<u64> for Amount {
    fn from(v: u64) -> Self {
        Amount(u128::from(v))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AmountParseError {
    pub input: String,
}

impl fmt::Display for AmountParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid amount '{}': expected a non-negative base-unit integer",
            self.input
        )
    }
}

impl std::error::Error for AmountParseError {}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        // u128::from_str accepts a leading '+'; ledger integers never carry one.
        if t.starts_with('+') {
            return Err(AmountParseError { input: s.to_string() });
        }
        t.parse::<u128>().map(Amount).map_err(|_| AmountParseError {
            input: s.to_string(),
        })
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or a decimal integer string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.parse::<Amount>().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
        Ok(Amount(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        u64::try_from(v)
            .map(Amount::from)
            .map_err(|_| E::custom(format!("amount must be non-negative, got {v}")))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

// ---------------------------------------------------------------------------
// Chain state / results
// ---------------------------------------------------------------------------

/// Chain-wide economic parameters. Read fresh on every pass; fees may change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    pub registration_fee: Amount,
}

/// Result of a broadcast mutating request.
///
/// `success` is what the ledger client observed. The engine never treats it
/// as ground truth; it re-reads state after every write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
    pub tx_hash: String,
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Register `owner` as `role` on `topic_id`, signed by `sender`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterMsg {
    pub sender: Address,
    pub topic_id: TopicId,
    pub owner: Address,
    pub role: Role,
}

impl RegisterMsg {
    /// Self-registration: the identity both signs and owns the registration.
    pub fn for_identity(identity: &Address, topic_id: TopicId, role: Role) -> Self {
        Self {
            sender: identity.clone(),
            topic_id,
            owner: identity.clone(),
            role,
        }
    }
}

/// Add `amount` (strictly positive) to `sender`'s stake on `topic_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddStakeMsg {
    pub sender: Address,
    pub topic_id: TopicId,
    pub amount: Amount,
}

/// Tagged envelope used on the wire (signing relay) and in dry-run logs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerMsg {
    Register(RegisterMsg),
    AddStake(AddStakeMsg),
}

impl LedgerMsg {
    /// Short human label for logs, e.g. `"register reputer topic=3"`.
    pub fn describe(&self) -> String {
        match self {
            LedgerMsg::Register(m) => format!("register {} topic={}", m.role, m.topic_id),
            LedgerMsg::AddStake(m) => format!("add stake {} topic={}", m.amount, m.topic_id),
        }
    }
}
