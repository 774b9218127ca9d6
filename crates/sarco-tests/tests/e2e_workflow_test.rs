//! End-to-end workflow tests for the Sarcophagus protocol
//!
//! These tests walk resources through their whole life: registration,
//! creation, rewrapping, publication, accusal and cleanup, checking token
//! movements and custody solvency along the way.

use sarco_core::{Address, Amount, KeyShare, DAY, HOUR, WEEK};
use sarco_protocol::testing::{Harness, TestCustodian};
use sarco_protocol::{ProtocolError, ResourceState, RevealMode};

const FEE: Amount = 100;
const CURSE: Amount = 10;
const BOND: Amount = 1_000_000_000;
const FUNDS: Amount = 1_000_000_000_000;

/// Digging fee for a week at `FEE` per second
const WEEK_FEE: Amount = FEE * WEEK as Amount;

/// Escrow per custodian for a one week resource
const ESCROW: Amount = WEEK_FEE + CURSE;

/// Cursed bond per custodian at the default 100%
const LOCK: Amount = WEEK_FEE + CURSE;

/// Protocol fee on five custodians' digging fees at the default 1%
const PROTOCOL_FEE: Amount = 5 * WEEK_FEE / 100;

fn setup(count: usize) -> (Harness, Vec<TestCustodian>, Address) {
    let mut h = Harness::new();
    let custodians = h.custodians(count, FEE, CURSE, BOND);
    let embalmer = h.funded_account(FUNDS);
    (h, custodians, embalmer)
}

/// Three of five custodians publish, the embalmer sweeps the other two
#[test]
fn test_full_resource_lifecycle() {
    // ==========================================
    // STEP 1: Register custodians and create a 3-of-5 resource
    // ==========================================
    let (mut h, custodians, embalmer) = setup(5);
    let resurrection = h.now() + WEEK;
    let params = h.params(resurrection, 3, RevealMode::KeyShare);
    let recipient = params.recipient;
    let fixture = h.create(embalmer, &custodians, params).unwrap();
    let id = fixture.id;

    assert_eq!(h.balance(&embalmer), FUNDS - 5 * ESCROW - PROTOCOL_FEE);
    assert_eq!(h.protocol.total_protocol_fees(), PROTOCOL_FEE);
    for c in &custodians {
        let profile = h.protocol.custodian(&c.address).unwrap();
        assert_eq!(profile.cursed_bond, LOCK);
        assert_eq!(profile.free_bond, BOND - LOCK);
    }
    assert_eq!(h.protocol.resources_by_embalmer(&embalmer), &[id]);
    assert_eq!(h.protocol.resources_by_recipient(&recipient), &[id]);
    h.assert_solvent();

    // ==========================================
    // STEP 2: Nobody may publish before the resurrection time
    // ==========================================
    let err = h
        .protocol
        .publish_key_share(custodians[0].address, id, fixture.secrets[0].clone())
        .unwrap_err();
    assert!(matches!(err, ProtocolError::TooEarly));

    // ==========================================
    // STEP 3: Three custodians publish inside the grace period
    // ==========================================
    h.set_time(resurrection);
    for i in 0..3 {
        let reward = h
            .protocol
            .publish_key_share(custodians[i].address, id, fixture.secrets[i].clone())
            .unwrap();
        assert_eq!(reward, ESCROW);
    }

    // A second publication is refused
    let err = h
        .protocol
        .publish_key_share(custodians[0].address, id, fixture.secrets[0].clone())
        .unwrap_err();
    assert!(matches!(err, ProtocolError::AlreadyPublished));

    // The recipient can now read the three shares
    let revealed: Vec<KeyShare> = h
        .protocol
        .state()
        .bonded_records(&id)
        .into_iter()
        .filter_map(|r| r.raw_key_share.clone())
        .collect();
    assert_eq!(revealed.len(), 3);
    for share in &fixture.secrets[..3] {
        assert!(revealed.contains(share));
    }
    h.assert_solvent();

    // ==========================================
    // STEP 4: Claim window exclusivity
    // ==========================================
    let grace_end = resurrection + h.protocol.config().grace_period;
    let window_end = grace_end + h.protocol.config().embalmer_claim_window;
    let stranger = h.funded_account(0);

    h.set_time(grace_end - 1);
    let err = h.protocol.clean(embalmer, id, embalmer).unwrap_err();
    assert!(matches!(err, ProtocolError::TooEarly));

    h.set_time(grace_end);
    let err = h
        .protocol
        .publish_key_share(custodians[3].address, id, fixture.secrets[3].clone())
        .unwrap_err();
    assert!(matches!(err, ProtocolError::TooLate));
    let err = h.protocol.clean(h.admin, id, h.admin).unwrap_err();
    assert!(matches!(err, ProtocolError::TooEarlyForAdminClean));
    let err = h.protocol.clean(stranger, id, stranger).unwrap_err();
    assert!(matches!(err, ProtocolError::NotEmbalmerOrAdmin));
    assert!(window_end > grace_end);

    // ==========================================
    // STEP 5: The embalmer sweeps the two silent custodians
    // ==========================================
    let before = h.balance(&embalmer);
    let swept = h.protocol.clean(embalmer, id, embalmer).unwrap();
    assert_eq!(swept, 2 * (LOCK + ESCROW));
    assert_eq!(h.balance(&embalmer), before + swept);

    let resource = h.protocol.resource(&id).unwrap();
    assert!(resource.is_cleaned);
    assert_eq!(resource.state, ResourceState::Done);

    for (i, c) in custodians.iter().enumerate() {
        let profile = h.protocol.custodian(&c.address).unwrap();
        assert_eq!(profile.cursed_bond, 0);
        if i < 3 {
            assert_eq!(profile.successes, 1);
            assert_eq!(profile.accrued_rewards, ESCROW);
            assert_eq!(profile.free_bond, BOND);
        } else {
            assert_eq!(profile.cleanups, 1);
            assert_eq!(profile.accrued_rewards, 0);
            assert_eq!(profile.free_bond, BOND - LOCK);
        }
    }

    let err = h.protocol.clean(embalmer, id, embalmer).unwrap_err();
    assert!(matches!(err, ProtocolError::AlreadyCleaned));
    h.assert_solvent();

    // ==========================================
    // STEP 6: Custodians cash out
    // ==========================================
    let paid = h.protocol.withdraw_rewards(custodians[0].address).unwrap();
    assert_eq!(paid, ESCROW);
    assert_eq!(h.balance(&custodians[0].address), ESCROW);
    h.protocol
        .withdraw_free_bond(custodians[0].address, BOND)
        .unwrap();
    assert_eq!(h.balance(&custodians[0].address), ESCROW + BOND);

    let err = h.protocol.withdraw_rewards(custodians[3].address).unwrap_err();
    assert!(matches!(err, ProtocolError::NothingToWithdraw));
    h.assert_solvent();
}

/// One leaked share out of a 3-of-5 resource
#[test]
fn test_accusal_below_threshold() {
    let (mut h, custodians, embalmer) = setup(5);
    let resurrection = h.now() + WEEK;
    let params = h.params(resurrection, 3, RevealMode::KeyShare);
    let fixture = h.create(embalmer, &custodians, params).unwrap();
    let id = fixture.id;
    let beneficiary = h.funded_account(0);
    let accuser = h.funded_account(0);

    // ==========================================
    // STEP 1: Accuse the first custodian with its leaked share
    // ==========================================
    h.advance(DAY);
    let before = h.balance(&embalmer);
    let outcome = h
        .protocol
        .accuse(accuser, id, vec![fixture.secrets[0].clone()], beneficiary)
        .unwrap();
    assert_eq!(outcome.newly_accused, vec![custodians[0].address]);
    assert_eq!(outcome.total_accused, 1);
    assert!(!outcome.compromised);
    assert_eq!(outcome.beneficiary_payout, LOCK / 2);
    assert_eq!(outcome.embalmer_payout, LOCK - LOCK / 2 + ESCROW);
    assert_eq!(h.balance(&beneficiary), LOCK / 2);
    assert_eq!(h.balance(&embalmer), before + LOCK - LOCK / 2 + ESCROW);

    let profile = h.protocol.custodian(&custodians[0].address).unwrap();
    assert_eq!(profile.accusals, 1);
    assert_eq!(profile.cursed_bond, 0);
    assert_eq!(profile.free_bond, BOND - LOCK);
    h.assert_solvent();

    // ==========================================
    // STEP 2: Repeating the accusal pays nothing
    // ==========================================
    let outcome = h
        .protocol
        .accuse(accuser, id, vec![fixture.secrets[0].clone()], beneficiary)
        .unwrap();
    assert!(outcome.newly_accused.is_empty());
    assert_eq!(outcome.total_accused, 1);
    assert_eq!(h.balance(&beneficiary), LOCK / 2);

    // An unrelated secret is rejected and changes nothing
    let events = h.protocol.events().len();
    let err = h
        .protocol
        .accuse(accuser, id, vec![KeyShare::new(vec![7; 32])], beneficiary)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::IncorrectProof));
    assert_eq!(h.protocol.events().len(), events);

    // ==========================================
    // STEP 3: The rest of the resource carries on
    // ==========================================
    h.set_time(resurrection);
    let err = h
        .protocol
        .accuse(accuser, id, vec![fixture.secrets[1].clone()], beneficiary)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::TooLateToAccuse));

    let err = h
        .protocol
        .publish_key_share(custodians[0].address, id, fixture.secrets[0].clone())
        .unwrap_err();
    assert!(matches!(err, ProtocolError::AlreadyAccused));
    for i in 1..5 {
        let reward = h
            .protocol
            .publish_key_share(custodians[i].address, id, fixture.secrets[i].clone())
            .unwrap();
        assert_eq!(reward, ESCROW);
    }
    h.assert_solvent();

    // Nothing left to sweep but the resource is still closed out
    h.set_time(resurrection + h.protocol.config().grace_period);
    let swept = h.protocol.clean(embalmer, id, embalmer).unwrap();
    assert_eq!(swept, 0);
    h.assert_solvent();
}

/// Three leaked shares compromise a 3-of-5 resource
#[test]
fn test_accusal_at_threshold_compromises() {
    let (mut h, custodians, embalmer) = setup(5);
    let resurrection = h.now() + WEEK;
    let params = h.params(resurrection, 3, RevealMode::KeyShare);
    let fixture = h.create(embalmer, &custodians, params).unwrap();
    let id = fixture.id;
    let beneficiary = h.funded_account(0);

    // ==========================================
    // STEP 1: Accuse three custodians at once
    // ==========================================
    h.advance(HOUR);
    let leaked = fixture.secrets[..3].to_vec();
    let outcome = h.protocol.accuse(beneficiary, id, leaked, beneficiary).unwrap();
    assert_eq!(outcome.newly_accused.len(), 3);
    assert_eq!(outcome.total_accused, 3);
    assert!(outcome.compromised);

    // Beneficiary gets half of each slashed bond, the embalmer gets the
    // other halves plus every escrowed fee back; the protocol fee stays
    assert_eq!(h.balance(&beneficiary), 3 * (LOCK / 2));
    assert_eq!(
        h.balance(&embalmer),
        FUNDS - PROTOCOL_FEE + 3 * (LOCK - LOCK / 2)
    );

    let resource = h.protocol.resource(&id).unwrap();
    assert!(resource.is_compromised);
    assert_eq!(resource.state, ResourceState::Done);

    // The two honest custodians are released without penalty
    for c in &custodians[3..] {
        let profile = h.protocol.custodian(&c.address).unwrap();
        assert_eq!(profile.cursed_bond, 0);
        assert_eq!(profile.free_bond, BOND);
        assert_eq!(profile.accusals, 0);
    }
    h.assert_solvent();

    // ==========================================
    // STEP 2: The resource is closed to everything
    // ==========================================
    let err = h
        .protocol
        .accuse(beneficiary, id, vec![fixture.secrets[3].clone()], beneficiary)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::AlreadyCompromised));
    let err = h.protocol.rewrap(embalmer, id, h.now() + DAY).unwrap_err();
    assert!(matches!(err, ProtocolError::Compromised));

    h.set_time(resurrection);
    let err = h
        .protocol
        .publish_key_share(custodians[3].address, id, fixture.secrets[3].clone())
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Compromised));

    h.set_time(resurrection + h.protocol.config().grace_period);
    let err = h.protocol.clean(embalmer, id, embalmer).unwrap_err();
    assert!(matches!(err, ProtocolError::Compromised));
    h.assert_solvent();
}

/// Signed parameters older than the expiration threshold are refused
#[test]
fn test_stale_parameters_rejected() {
    let (mut h, custodians, embalmer) = setup(3);
    let threshold = h.protocol.config().expiration_threshold;

    // ==========================================
    // STEP 1: Custodians sign, the embalmer waits too long
    // ==========================================
    let params = h.params(h.now() + WEEK, 2, RevealMode::KeyShare);
    let id = h.resource_id(embalmer, &params);
    h.advance(threshold + 1);

    let err = h.create(embalmer, &custodians, params.clone()).unwrap_err();
    assert!(matches!(err, ProtocolError::ParametersExpired { .. }));
    assert!(h.protocol.resource(&id).is_none());
    assert_eq!(h.balance(&embalmer), FUNDS);
    for c in &custodians {
        assert_eq!(h.protocol.custodian(&c.address).unwrap().cursed_bond, 0);
    }
    h.assert_solvent();

    // ==========================================
    // STEP 2: Parameters at exactly the threshold are still accepted
    // ==========================================
    let mut fresh = h.params(h.now() + WEEK, 2, RevealMode::KeyShare);
    fresh.creation_time = h.now() - threshold;
    h.create(embalmer, &custodians, fresh).unwrap();

    // Parameters from the future are refused
    let mut future = h.params(h.now() + WEEK, 2, RevealMode::KeyShare);
    future.creation_time = h.now() + 1;
    let err = h.create(embalmer, &custodians, future).unwrap_err();
    assert!(matches!(err, ProtocolError::CreationTimeInFuture(_)));
    h.assert_solvent();
}

/// Rewrap pushes the deadline out and pays for time served; burial settles
#[test]
fn test_rewrap_then_bury() {
    let (mut h, custodians, embalmer) = setup(3);
    let params = h.params(h.now() + WEEK, 2, RevealMode::KeyShare);
    let fixture = h.create(embalmer, &custodians, params).unwrap();
    let id = fixture.id;

    // ==========================================
    // STEP 1: Rewrap a day in, for another week
    // ==========================================
    h.advance(DAY);
    let new_time = h.now() + WEEK;
    h.protocol.rewrap(embalmer, id, new_time).unwrap();

    let resource = h.protocol.resource(&id).unwrap();
    assert_eq!(resource.resurrection_time, new_time);
    assert_eq!(resource.previous_rewrap_time, h.now());
    for c in &custodians {
        let profile = h.protocol.custodian(&c.address).unwrap();
        assert_eq!(profile.accrued_rewards, FEE * DAY as Amount);
        assert_eq!(profile.cursed_bond, LOCK);
    }
    h.assert_solvent();

    // Only the embalmer may rewrap
    let err = h
        .protocol
        .rewrap(custodians[0].address, id, new_time)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::NotEmbalmer));

    // ==========================================
    // STEP 2: Bury another day later
    // ==========================================
    h.advance(DAY);
    h.protocol.bury(embalmer, id).unwrap();

    let resource = h.protocol.resource(&id).unwrap();
    assert_eq!(resource.state, ResourceState::Done);
    for c in &custodians {
        let profile = h.protocol.custodian(&c.address).unwrap();
        assert_eq!(profile.accrued_rewards, 2 * FEE * DAY as Amount);
        assert_eq!(profile.cursed_bond, 0);
        assert_eq!(profile.free_bond, BOND);
    }
    h.assert_solvent();

    // Nothing may happen to a buried resource
    let err = h.protocol.bury(embalmer, id).unwrap_err();
    assert!(matches!(err, ProtocolError::Inactive));
    h.set_time(new_time);
    let err = h
        .protocol
        .publish_key_share(custodians[0].address, id, fixture.secrets[0].clone())
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Inactive));
}

/// The admin sweeps what the embalmer left unclaimed into protocol fees
#[test]
fn test_admin_clean_after_claim_window() {
    let (mut h, custodians, embalmer) = setup(2);
    let resurrection = h.now() + WEEK;
    let params = h.params(resurrection, 1, RevealMode::PrivateKey);
    let fixture = h.create(embalmer, &custodians, params).unwrap();
    let id = fixture.id;
    let fees_at_create = h.protocol.total_protocol_fees();

    // ==========================================
    // STEP 1: One custodian publishes its private key
    // ==========================================
    h.set_time(resurrection);
    let err = h
        .protocol
        .publish_key_share(custodians[0].address, id, fixture.secrets[0].clone())
        .unwrap_err();
    assert!(matches!(err, ProtocolError::WrongRevealMode));
    h.protocol
        .publish_private_key(custodians[0].address, id, fixture.secrets[0].clone())
        .unwrap();

    // ==========================================
    // STEP 2: The claim window lapses and the admin sweeps
    // ==========================================
    let config = h.protocol.config().clone();
    let window_end = resurrection + config.grace_period + config.embalmer_claim_window;
    h.set_time(window_end);
    let err = h.protocol.clean(embalmer, id, embalmer).unwrap_err();
    assert!(matches!(err, ProtocolError::ClaimWindowPassed));

    let swept = h.protocol.clean(h.admin, id, h.admin).unwrap();
    assert_eq!(swept, LOCK + ESCROW);
    assert_eq!(h.protocol.total_protocol_fees(), fees_at_create + swept);
    h.assert_solvent();

    // ==========================================
    // STEP 3: The admin withdraws protocol fees
    // ==========================================
    let treasury = h.funded_account(0);
    let admin = h.admin;
    let paid = h.protocol.withdraw_protocol_fees(admin, treasury).unwrap();
    assert_eq!(paid, fees_at_create + swept);
    assert_eq!(h.balance(&treasury), paid);
    assert_eq!(h.protocol.total_protocol_fees(), 0);

    let err = h.protocol.withdraw_protocol_fees(admin, treasury).unwrap_err();
    assert!(matches!(err, ProtocolError::NothingToWithdraw));
    let err = h.protocol.withdraw_protocol_fees(embalmer, treasury).unwrap_err();
    assert!(matches!(err, ProtocolError::NotAdmin));
    h.assert_solvent();
}
