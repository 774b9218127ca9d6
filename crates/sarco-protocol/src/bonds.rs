//! Bond ledger
//!
//! Moves value between a custodian's free and cursed balances. These
//! functions only touch the profile (and, for the record-level helpers, the
//! bonded record); any ledger transfer that goes with a slash is made by the
//! calling engine. Atomicity comes from the enclosing [`crate::store::Tx`].

use sarco_core::{Address, Amount};

use crate::custodian::CustodianProfile;
use crate::error::{ProtocolError, Result};
use crate::sarcophagus::BondedCustodianRecord;

/// Move `amount` from free to cursed bond
pub fn lock(profile: &mut CustodianProfile, custodian: Address, amount: Amount) -> Result<()> {
    if amount > profile.free_bond {
        return Err(ProtocolError::InsufficientFreeBond {
            custodian,
            required: amount,
            available: profile.free_bond,
        });
    }
    profile.free_bond -= amount;
    profile.cursed_bond = profile
        .cursed_bond
        .checked_add(amount)
        .ok_or(ProtocolError::ArithmeticOverflow)?;
    Ok(())
}

/// Move up to `amount` from cursed back to free bond; returns what moved
pub fn unlock(profile: &mut CustodianProfile, amount: Amount) -> Result<Amount> {
    let moved = amount.min(profile.cursed_bond);
    profile.cursed_bond -= moved;
    profile.free_bond = profile
        .free_bond
        .checked_add(moved)
        .ok_or(ProtocolError::ArithmeticOverflow)?;
    Ok(moved)
}

/// Destroy up to `amount` of cursed bond; returns what was destroyed
pub fn slash(profile: &mut CustodianProfile, amount: Amount) -> Amount {
    let slashed = amount.min(profile.cursed_bond);
    profile.cursed_bond -= slashed;
    slashed
}

pub fn accrue_reward(profile: &mut CustodianProfile, amount: Amount) -> Result<()> {
    profile.accrued_rewards = profile
        .accrued_rewards
        .checked_add(amount)
        .ok_or(ProtocolError::ArithmeticOverflow)?;
    Ok(())
}

/// Lock `amount` for a record
pub fn lock_for_record(
    profile: &mut CustodianProfile,
    record: &mut BondedCustodianRecord,
    amount: Amount,
) -> Result<()> {
    lock(profile, record.custodian, amount)?;
    record.cursed_bond = record
        .cursed_bond
        .checked_add(amount)
        .ok_or(ProtocolError::ArithmeticOverflow)?;
    Ok(())
}

/// Adjust a record's lock to exactly `target`, locking or unlocking the delta
pub fn relock(
    profile: &mut CustodianProfile,
    record: &mut BondedCustodianRecord,
    target: Amount,
) -> Result<()> {
    if target > record.cursed_bond {
        lock_for_record(profile, record, target - record.cursed_bond)
    } else {
        let excess = record.cursed_bond - target;
        let moved = unlock(profile, excess)?;
        record.cursed_bond -= moved;
        Ok(())
    }
}

/// Unlock everything held for a record; returns the released amount
pub fn release(profile: &mut CustodianProfile, record: &mut BondedCustodianRecord) -> Result<Amount> {
    let released = unlock(profile, record.cursed_bond)?;
    record.cursed_bond = 0;
    Ok(released)
}

/// Slash everything held for a record; returns the slashed amount
pub fn forfeit(profile: &mut CustodianProfile, record: &mut BondedCustodianRecord) -> Amount {
    let slashed = slash(profile, record.cursed_bond);
    record.cursed_bond = 0;
    slashed
}
