//! Custodian registry
//!
//! Registration, term updates and the free-bond / reward withdrawals a
//! custodian makes against custody.

use tracing::{debug, info};

use sarco_core::{Address, Amount};

use crate::custodian::{CustodianProfile, CustodianTerms};
use crate::error::{ProtocolError, Result};
use crate::events::ProtocolEvent;
use crate::ledger::TokenLedger;
use crate::store::{add, Tx};

fn validate_terms(terms: &CustodianTerms) -> Result<()> {
    if terms.minimum_fee_per_second == 0 {
        return Err(ProtocolError::ZeroTerm("minimum_fee_per_second"));
    }
    if terms.maximum_allowed_interval == 0 {
        return Err(ProtocolError::ZeroTerm("maximum_allowed_interval"));
    }
    Ok(())
}

/// Create a profile for `caller`, pulling the declared free bond into custody
pub(crate) fn register<L: TokenLedger>(
    tx: &mut Tx<'_, L>,
    caller: Address,
    terms: &CustodianTerms,
) -> Result<()> {
    if tx.state.custodians.contains_key(&caller) {
        return Err(ProtocolError::AlreadyRegistered(caller));
    }
    validate_terms(terms)?;
    if terms.free_bond == 0 {
        return Err(ProtocolError::ZeroTerm("free_bond"));
    }

    tx.collect(caller, terms.free_bond)?;

    let mut profile = CustodianProfile::from_terms(terms);
    profile.free_bond = terms.free_bond;
    tx.state.custodians.insert(caller, profile);
    tx.state.emit(ProtocolEvent::CustodianRegistered {
        custodian: caller,
        peer_id: terms.peer_id.clone(),
        free_bond: terms.free_bond,
    });

    info!("Registered custodian {} with free bond {}", caller.short(), terms.free_bond);
    Ok(())
}

/// Replace a custodian's terms; `terms.free_bond` is an additive top-up
pub(crate) fn update<L: TokenLedger>(
    tx: &mut Tx<'_, L>,
    caller: Address,
    terms: &CustodianTerms,
) -> Result<()> {
    if !tx.state.custodians.contains_key(&caller) {
        return Err(ProtocolError::NotRegistered(caller));
    }
    validate_terms(terms)?;

    tx.collect(caller, terms.free_bond)?;

    let profile = tx.state.profile_mut(&caller)?;
    profile.apply_terms(terms);
    profile.free_bond = add(profile.free_bond, terms.free_bond)?;
    tx.state.emit(ProtocolEvent::CustodianUpdated {
        custodian: caller,
        top_up: terms.free_bond,
    });

    info!("Updated terms for custodian {}", caller.short());
    Ok(())
}

pub(crate) fn deposit_free_bond<L: TokenLedger>(
    tx: &mut Tx<'_, L>,
    caller: Address,
    amount: Amount,
) -> Result<()> {
    if !tx.state.custodians.contains_key(&caller) {
        return Err(ProtocolError::NotRegistered(caller));
    }
    if amount == 0 {
        return Err(ProtocolError::ZeroTerm("free_bond"));
    }

    tx.collect(caller, amount)?;

    let profile = tx.state.profile_mut(&caller)?;
    profile.free_bond = add(profile.free_bond, amount)?;
    tx.state.emit(ProtocolEvent::FreeBondDeposited {
        custodian: caller,
        amount,
    });

    debug!("Custodian {} deposited {} free bond", caller.short(), amount);
    Ok(())
}

pub(crate) fn withdraw_free_bond<L: TokenLedger>(
    tx: &mut Tx<'_, L>,
    caller: Address,
    amount: Amount,
) -> Result<()> {
    let profile = tx.state.profile_mut(&caller)?;
    if amount > profile.free_bond {
        return Err(ProtocolError::InsufficientFreeBond {
            custodian: caller,
            required: amount,
            available: profile.free_bond,
        });
    }
    profile.free_bond -= amount;

    tx.pay(caller, amount)?;
    tx.state.emit(ProtocolEvent::FreeBondWithdrawn {
        custodian: caller,
        amount,
    });

    info!("Custodian {} withdrew {} free bond", caller.short(), amount);
    Ok(())
}

/// Pay out everything the custodian has accrued
pub(crate) fn withdraw_rewards<L: TokenLedger>(
    tx: &mut Tx<'_, L>,
    caller: Address,
) -> Result<Amount> {
    let profile = tx.state.profile_mut(&caller)?;
    let amount = profile.accrued_rewards;
    if amount == 0 {
        return Err(ProtocolError::NothingToWithdraw);
    }
    profile.accrued_rewards = 0;

    tx.pay(caller, amount)?;
    tx.state.emit(ProtocolEvent::RewardsWithdrawn {
        custodian: caller,
        amount,
    });

    info!("Custodian {} withdrew {} in rewards", caller.short(), amount);
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{terms, Harness};

    #[test]
    fn test_register_pulls_bond_into_custody() {
        let mut h = Harness::new();
        let custodian = h.funded_account(10_000);

        h.protocol.register(custodian, terms(100, 5_000)).unwrap();

        let profile = h.protocol.custodian(&custodian).unwrap();
        assert_eq!(profile.free_bond, 5_000);
        assert_eq!(h.balance(&custodian), 5_000);
        assert_eq!(h.custody_balance(), 5_000);
        h.assert_solvent();
    }

    #[test]
    fn test_register_twice_fails() {
        let mut h = Harness::new();
        let custodian = h.funded_account(10_000);
        h.protocol.register(custodian, terms(100, 1_000)).unwrap();

        let err = h.protocol.register(custodian, terms(100, 1_000)).unwrap_err();
        assert!(matches!(err, ProtocolError::AlreadyRegistered(a) if a == custodian));
    }

    #[test]
    fn test_register_rejects_zero_terms() {
        let mut h = Harness::new();
        let custodian = h.funded_account(10_000);

        let err = h.protocol.register(custodian, terms(0, 1_000)).unwrap_err();
        assert!(matches!(err, ProtocolError::ZeroTerm("minimum_fee_per_second")));

        let err = h.protocol.register(custodian, terms(100, 0)).unwrap_err();
        assert!(matches!(err, ProtocolError::ZeroTerm("free_bond")));

        let mut zero_interval = terms(100, 1_000);
        zero_interval.maximum_allowed_interval = 0;
        let err = h.protocol.register(custodian, zero_interval).unwrap_err();
        assert!(matches!(err, ProtocolError::ZeroTerm("maximum_allowed_interval")));

        assert!(h.protocol.custodian(&custodian).is_none());
    }

    #[test]
    fn test_register_without_funds_fails_cleanly() {
        let mut h = Harness::new();
        let custodian = h.funded_account(100);

        let err = h.protocol.register(custodian, terms(100, 1_000)).unwrap_err();
        assert!(matches!(err, ProtocolError::PaymentFailed(_)));
        assert!(h.protocol.custodian(&custodian).is_none());
        assert_eq!(h.balance(&custodian), 100);
    }

    #[test]
    fn test_update_tops_up_and_replaces_terms() {
        let mut h = Harness::new();
        let custodian = h.funded_account(10_000);
        h.protocol.register(custodian, terms(100, 1_000)).unwrap();

        let mut new_terms = terms(250, 500);
        new_terms.peer_id = "peer-2".to_string();
        h.protocol.update(custodian, new_terms).unwrap();

        let profile = h.protocol.custodian(&custodian).unwrap();
        assert_eq!(profile.minimum_fee_per_second, 250);
        assert_eq!(profile.peer_id, "peer-2");
        assert_eq!(profile.free_bond, 1_500);

        h.protocol.update(custodian, terms(250, 0)).unwrap();
        assert_eq!(h.protocol.custodian(&custodian).unwrap().free_bond, 1_500);
        h.assert_solvent();
    }

    #[test]
    fn test_update_unregistered_fails() {
        let mut h = Harness::new();
        let stranger = h.funded_account(10_000);
        let err = h.protocol.update(stranger, terms(100, 0)).unwrap_err();
        assert!(matches!(err, ProtocolError::NotRegistered(_)));
    }

    #[test]
    fn test_withdraw_free_bond() {
        let mut h = Harness::new();
        let custodian = h.funded_account(10_000);
        h.protocol.register(custodian, terms(100, 1_000)).unwrap();

        let err = h.protocol.withdraw_free_bond(custodian, 1_001).unwrap_err();
        assert!(matches!(err, ProtocolError::InsufficientFreeBond { .. }));

        h.protocol.withdraw_free_bond(custodian, 400).unwrap();
        assert_eq!(h.protocol.custodian(&custodian).unwrap().free_bond, 600);
        assert_eq!(h.balance(&custodian), 9_400);
        h.assert_solvent();
    }

    #[test]
    fn test_deposit_and_nothing_to_withdraw() {
        let mut h = Harness::new();
        let custodian = h.funded_account(10_000);
        h.protocol.register(custodian, terms(100, 1_000)).unwrap();

        h.protocol.deposit_free_bond(custodian, 250).unwrap();
        assert_eq!(h.protocol.custodian(&custodian).unwrap().free_bond, 1_250);

        let err = h.protocol.deposit_free_bond(custodian, 0).unwrap_err();
        assert!(matches!(err, ProtocolError::ZeroTerm(_)));

        let err = h.protocol.withdraw_rewards(custodian).unwrap_err();
        assert!(matches!(err, ProtocolError::NothingToWithdraw));
    }
}
