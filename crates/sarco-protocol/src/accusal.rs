//! Accusal engine
//!
//! Anyone holding a secret that leaked before the resurrection time can
//! prove it here. Each leaked custodian's record bond is slashed and split
//! between the beneficiary and the embalmer, and the embalmer gets the
//! custodian's escrowed fees back. Once `threshold` custodians are accused
//! the secret is considered recoverable by outsiders: the resource is
//! compromised and the remaining custodians are released without penalty.

use tracing::{debug, info, warn};

use sarco_core::{Address, Amount, KeyShare, ResourceId};

use crate::bonds;
use crate::error::{ProtocolError, Result};
use crate::events::ProtocolEvent;
use crate::ledger::TokenLedger;
use crate::sarcophagus::{AccusalOutcome, ResourceState, Sarcophagus};
use crate::store::{add, RecordSet, Tx};

/// Custodian whose commitment `secret` opens, skipping published records
fn match_secret(resource: &Sarcophagus, records: &RecordSet, secret: &KeyShare) -> Option<Address> {
    resource
        .custodians
        .iter()
        .filter_map(|c| records.get(c))
        .find(|r| !r.has_published && r.commitment.matches(secret.as_bytes()))
        .map(|r| r.custodian)
}

/// Accuse the custodians behind `leaked`, compromising the resource at
/// `threshold`; a partial accusal slashes without compromising
pub(crate) fn accuse<L: TokenLedger>(
    tx: &mut Tx<'_, L>,
    caller: Address,
    id: ResourceId,
    leaked: &[KeyShare],
    beneficiary: Address,
) -> Result<AccusalOutcome> {
    let mut resource = tx.state.load_resource(&id)?;
    if resource.is_compromised {
        return Err(ProtocolError::AlreadyCompromised);
    }
    if resource.state != ResourceState::Active {
        return Err(ProtocolError::Inactive);
    }
    if tx.now >= resource.resurrection_time {
        return Err(ProtocolError::TooLateToAccuse);
    }
    if leaked.is_empty() {
        return Err(ProtocolError::NotEnoughProof);
    }

    let mut records = tx.state.load_records(&id)?;
    let mut outcome = AccusalOutcome::default();

    for secret in leaked {
        let Some(custodian) = match_secret(&resource, &records, secret) else {
            warn!("Accusal against resource {} carried an unmatched secret", id.short());
            return Err(ProtocolError::IncorrectProof);
        };
        let Some(record) = records.get_mut(&custodian) else {
            return Err(ProtocolError::IncorrectProof);
        };
        if record.is_accused {
            debug!("Custodian {} already accused, skipping", custodian.short());
            continue;
        }

        let escrow = record.escrowed_fees(&resource)?;
        let profile = tx.state.profile_mut(&custodian)?;
        let slashed = bonds::forfeit(profile, record);
        profile.accusals += 1;
        record.is_accused = true;

        let to_beneficiary = slashed / 2;
        let to_embalmer = add(slashed - to_beneficiary, escrow)?;
        tx.pay(beneficiary, to_beneficiary)?;
        tx.pay(resource.embalmer, to_embalmer)?;

        outcome.newly_accused.push(custodian);
        outcome.beneficiary_payout = add(outcome.beneficiary_payout, to_beneficiary)?;
        outcome.embalmer_payout = add(outcome.embalmer_payout, to_embalmer)?;
        tx.state.emit(ProtocolEvent::CustodianAccused {
            resource: id,
            custodian,
            accuser: caller,
            beneficiary,
            slashed,
        });

        info!(
            "Custodian {} accused on resource {}: slashed {}, {} to beneficiary",
            custodian.short(),
            id.short(),
            slashed,
            to_beneficiary
        );
    }

    let accused = records.values().filter(|r| r.is_accused).count();
    outcome.total_accused = u32::try_from(accused).map_err(|_| ProtocolError::ArithmeticOverflow)?;

    if outcome.total_accused >= resource.threshold {
        let mut released = Vec::new();
        let mut refund: Amount = 0;
        for record in records.values_mut().filter(|r| r.is_pending()) {
            refund = add(refund, record.escrowed_fees(&resource)?)?;
            let profile = tx.state.profile_mut(&record.custodian)?;
            bonds::release(profile, record)?;
            released.push(record.custodian);
        }
        tx.pay(resource.embalmer, refund)?;
        outcome.embalmer_payout = add(outcome.embalmer_payout, refund)?;
        outcome.compromised = true;

        resource.is_compromised = true;
        resource.state = ResourceState::Done;
        tx.state.emit(ProtocolEvent::ResourceCompromised {
            resource: id,
            released: released.clone(),
        });

        warn!(
            "Resource {} compromised after {} accusals; released {} custodians",
            id.short(),
            outcome.total_accused,
            released.len()
        );
    }

    tx.state.store_resource(resource);
    tx.state.store_records(id, records);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sarcophagus::RevealMode;
    use crate::testing::Harness;
    use sarco_core::{DAY, WEEK};

    const FEE: Amount = 100;
    const CURSE: Amount = 10;
    const BOND: Amount = 1_000_000_000;

    #[test]
    fn test_accuse_slashes_and_splits() {
        let mut h = Harness::new();
        let embalmer = h.funded_account(1_000_000_000);
        let watchdog = h.funded_account(0);
        let custodians = h.custodians(3, FEE, CURSE, BOND);
        let params = h.params(h.now() + WEEK, 2, RevealMode::KeyShare);
        let fixture = h.create(embalmer, &custodians, params).unwrap();

        h.advance(DAY);
        let before = h.balance(&embalmer);
        let outcome = h
            .protocol
            .accuse(watchdog, fixture.id, vec![fixture.secrets[0].clone()], watchdog)
            .unwrap();

        let lock = FEE * WEEK as Amount + CURSE;
        assert_eq!(outcome.newly_accused, vec![custodians[0].address]);
        assert_eq!(outcome.total_accused, 1);
        assert!(!outcome.compromised);
        assert_eq!(h.balance(&watchdog), lock / 2);
        assert_eq!(h.balance(&embalmer) - before, lock - lock / 2 + lock);

        let profile = h.protocol.custodian(&custodians[0].address).unwrap();
        assert_eq!(profile.cursed_bond, 0);
        assert_eq!(profile.free_bond, BOND - lock);
        assert_eq!(profile.accusals, 1);
        assert!(h.protocol.resource(&fixture.id).unwrap().is_live());
        h.assert_solvent();
    }

    #[test]
    fn test_accuse_is_idempotent() {
        let mut h = Harness::new();
        let embalmer = h.funded_account(1_000_000_000);
        let watchdog = h.funded_account(0);
        let custodians = h.custodians(3, FEE, CURSE, BOND);
        let params = h.params(h.now() + WEEK, 3, RevealMode::KeyShare);
        let fixture = h.create(embalmer, &custodians, params).unwrap();

        let leaked = vec![fixture.secrets[1].clone(), fixture.secrets[1].clone()];
        let first = h
            .protocol
            .accuse(watchdog, fixture.id, leaked.clone(), watchdog)
            .unwrap();
        assert_eq!(first.newly_accused.len(), 1);

        let events = h.protocol.events().len();
        let paid = h.balance(&watchdog);
        let second = h.protocol.accuse(watchdog, fixture.id, leaked, watchdog).unwrap();
        assert!(second.newly_accused.is_empty());
        assert_eq!(second.total_accused, 1);
        assert_eq!(h.balance(&watchdog), paid);
        assert_eq!(h.protocol.events().len(), events);
        assert_eq!(h.protocol.custodian(&custodians[1].address).unwrap().accusals, 1);
        h.assert_solvent();
    }

    #[test]
    fn test_accuse_reaching_threshold_compromises() {
        let mut h = Harness::new();
        let embalmer = h.funded_account(1_000_000_000);
        let watchdog = h.funded_account(0);
        let custodians = h.custodians(4, FEE, CURSE, BOND);
        let params = h.params(h.now() + WEEK, 2, RevealMode::KeyShare);
        let fixture = h.create(embalmer, &custodians, params).unwrap();

        let outcome = h
            .protocol
            .accuse(
                watchdog,
                fixture.id,
                vec![fixture.secrets[0].clone(), fixture.secrets[3].clone()],
                watchdog,
            )
            .unwrap();
        assert!(outcome.compromised);
        assert_eq!(outcome.total_accused, 2);

        let resource = h.protocol.resource(&fixture.id).unwrap();
        assert!(resource.is_compromised);
        assert_eq!(resource.state, ResourceState::Done);

        for c in &custodians[1..3] {
            let profile = h.protocol.custodian(&c.address).unwrap();
            assert_eq!(profile.cursed_bond, 0);
            assert_eq!(profile.free_bond, BOND);
            assert_eq!(profile.accusals, 0);
        }

        let err = h
            .protocol
            .accuse(watchdog, fixture.id, vec![fixture.secrets[1].clone()], watchdog)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::AlreadyCompromised));
        h.assert_solvent();
    }

    #[test]
    fn test_accuse_rejections_leave_state_untouched() {
        let mut h = Harness::new();
        let embalmer = h.funded_account(1_000_000_000);
        let watchdog = h.funded_account(0);
        let custodians = h.custodians(2, FEE, CURSE, BOND);
        let params = h.params(h.now() + WEEK, 2, RevealMode::KeyShare);
        let fixture = h.create(embalmer, &custodians, params).unwrap();

        let err = h.protocol.accuse(watchdog, fixture.id, vec![], watchdog).unwrap_err();
        assert!(matches!(err, ProtocolError::NotEnoughProof));

        let bogus = vec![fixture.secrets[0].clone(), KeyShare::new(b"nope".to_vec())];
        let err = h.protocol.accuse(watchdog, fixture.id, bogus, watchdog).unwrap_err();
        assert!(matches!(err, ProtocolError::IncorrectProof));
        let record = h
            .protocol
            .bonded_record(&fixture.id, &custodians[0].address)
            .unwrap();
        assert!(!record.is_accused);
        assert_eq!(h.balance(&watchdog), 0);

        h.advance(WEEK);
        let err = h
            .protocol
            .accuse(watchdog, fixture.id, vec![fixture.secrets[0].clone()], watchdog)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::TooLateToAccuse));

        let err = h
            .protocol
            .accuse(watchdog, ResourceId::new([3; 32]), vec![], watchdog)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::NotFound(_)));
    }

    #[test]
    fn test_accused_custodian_cannot_publish() {
        let mut h = Harness::new();
        let embalmer = h.funded_account(1_000_000_000);
        let watchdog = h.funded_account(0);
        let custodians = h.custodians(3, FEE, CURSE, BOND);
        let params = h.params(h.now() + WEEK, 2, RevealMode::KeyShare);
        let fixture = h.create(embalmer, &custodians, params).unwrap();

        h.protocol
            .accuse(watchdog, fixture.id, vec![fixture.secrets[2].clone()], watchdog)
            .unwrap();
        h.advance(WEEK);

        let err = h
            .protocol
            .publish_key_share(custodians[2].address, fixture.id, fixture.secrets[2].clone())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::AlreadyAccused));
        h.protocol
            .publish_key_share(custodians[0].address, fixture.id, fixture.secrets[0].clone())
            .unwrap();
        h.assert_solvent();
    }

    #[test]
    fn test_accuse_buried_resource_is_inactive() {
        let mut h = Harness::new();
        let embalmer = h.funded_account(1_000_000_000);
        let custodians = h.custodians(1, FEE, CURSE, BOND);
        let params = h.params(h.now() + WEEK, 1, RevealMode::KeyShare);
        let fixture = h.create(embalmer, &custodians, params).unwrap();
        h.protocol.bury(embalmer, fixture.id).unwrap();

        let err = h
            .protocol
            .accuse(embalmer, fixture.id, vec![fixture.secrets[0].clone()], embalmer)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Inactive));
    }
}
