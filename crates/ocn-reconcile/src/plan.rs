//! Pure decision helpers. No IO.

use ocn_ledger::Amount;

/// Registration is attempted only when the balance covers the fee.
pub fn can_afford_registration(balance: Amount, registration_fee: Amount) -> bool {
    balance >= registration_fee
}

/// Positive shortfall `min_stake - current`, or `None` when nothing is owed.
///
/// Never returns zero: a zero top-up is not a valid ledger message.
pub fn stake_top_up(current: Amount, min_stake: Amount) -> Option<Amount> {
    min_stake
        .checked_sub(current)
        .filter(|delta| !delta.is_zero())
}

pub fn stake_satisfied(current: Amount, min_stake: Amount) -> bool {
    current >= min_stake
}
