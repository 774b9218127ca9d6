//! Lifecycle state machine
//!
//! Embalmer-driven transitions: `create` (nothing -> Active), `rewrap`
//! (Active -> Active with a later resurrection time) and `bury`
//! (Active -> Done).

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use sarco_core::{Address, Amount, ResourceId, SignatureVerifier, NEVER};

use crate::bonds;
use crate::error::{ProtocolError, Result};
use crate::events::ProtocolEvent;
use crate::fees;
use crate::ledger::TokenLedger;
use crate::sarcophagus::{
    BondedCustodianRecord, CreateParams, CustodianCommitment, ResourceState, Sarcophagus,
};
use crate::store::{add, RecordSet, Tx};

fn check_schedule<L>(tx: &Tx<'_, L>, params: &CreateParams) -> Result<()> {
    let config = &tx.state.config;
    if params.creation_time > tx.now {
        return Err(ProtocolError::CreationTimeInFuture(params.creation_time));
    }
    if tx.now - params.creation_time > config.expiration_threshold {
        return Err(ProtocolError::ParametersExpired {
            creation_time: params.creation_time,
            now: tx.now,
        });
    }
    if params.resurrection_time <= tx.now {
        return Err(ProtocolError::ResurrectionTimeInPast);
    }
    if params.resurrection_time
        > params
            .creation_time
            .saturating_add(params.maximum_rewrap_interval)
    {
        return Err(ProtocolError::ResurrectionTimeTooFar);
    }
    Ok(())
}

fn check_custodian_set(params: &CreateParams, commitments: &[CustodianCommitment]) -> Result<()> {
    if commitments.is_empty() {
        return Err(ProtocolError::NoCustodians);
    }
    if params.threshold == 0 || params.threshold as usize > commitments.len() {
        return Err(ProtocolError::InvalidThreshold {
            threshold: params.threshold,
            custodians: commitments.len(),
        });
    }
    let mut seen = BTreeSet::new();
    let mut committed = BTreeSet::new();
    for c in commitments {
        if !seen.insert(c.custodian) {
            return Err(ProtocolError::DuplicateCustodian(c.custodian));
        }
        // A leaked secret must identify exactly one custodian
        if !committed.insert(c.commitment.to_bytes()) {
            return Err(ProtocolError::DuplicateCommitment(c.custodian));
        }
    }
    Ok(())
}

/// Check one custodian's signed agreement against its registered terms
fn check_commitment<L, V: SignatureVerifier>(
    tx: &Tx<'_, L>,
    verifier: &V,
    params: &CreateParams,
    c: &CustodianCommitment,
) -> Result<()> {
    let profile = tx
        .state
        .custodian(&c.custodian)
        .ok_or(ProtocolError::NotRegistered(c.custodian))?;

    if c.commitment.kind() != params.reveal_mode.commitment_kind() {
        return Err(ProtocolError::CommitmentModeMismatch(c.custodian));
    }

    let digest = c.message(params).digest();
    if !verifier.verify(&digest, &c.custodian, &c.signature) {
        warn!("Rejected signature from custodian {}", c.custodian.short());
        return Err(ProtocolError::InvalidSignature(c.custodian));
    }

    if c.fee_per_second < profile.minimum_fee_per_second || c.curse_fee < profile.curse_fee {
        return Err(ProtocolError::FeeBelowMinimum(c.custodian));
    }
    if params.maximum_rewrap_interval > profile.maximum_allowed_interval {
        return Err(ProtocolError::IntervalExceedsTerms(c.custodian));
    }
    if params.resurrection_time > profile.maximum_allowed_resurrection_timestamp {
        return Err(ProtocolError::ResurrectionExceedsTerms(c.custodian));
    }
    Ok(())
}

/// Create a resource, bond every custodian and collect the embalmer's fees
pub(crate) fn create<L: TokenLedger, V: SignatureVerifier>(
    tx: &mut Tx<'_, L>,
    verifier: &V,
    caller: Address,
    id: ResourceId,
    params: CreateParams,
    commitments: Vec<CustodianCommitment>,
) -> Result<()> {
    if tx.state.resources.contains_key(&id) {
        return Err(ProtocolError::AlreadyExists(id));
    }
    check_schedule(tx, &params)?;
    check_custodian_set(&params, &commitments)?;
    for c in &commitments {
        check_commitment(tx, verifier, &params, c)?;
    }

    let config = tx.state.config.clone();
    let span = params.resurrection_time - params.creation_time;
    let mut records = RecordSet::new();
    let mut digging_total: Amount = 0;
    let mut curse_total: Amount = 0;

    for c in &commitments {
        let mut record = BondedCustodianRecord {
            custodian: c.custodian,
            fee_per_second: c.fee_per_second,
            curse_fee: c.curse_fee,
            commitment: c.commitment,
            raw_key_share: None,
            cursed_bond: 0,
            is_accused: false,
            has_published: false,
        };
        let digging_fee = record.digging_fee(span)?;
        let lock = fees::cursed_bond(&config, digging_fee, c.curse_fee)?;
        let profile = tx.state.profile_mut(&c.custodian)?;
        bonds::lock_for_record(profile, &mut record, lock)?;

        digging_total = add(digging_total, digging_fee)?;
        curse_total = add(curse_total, c.curse_fee)?;
        records.insert(c.custodian, record);
    }

    let protocol_fee = fees::protocol_fee(&config, digging_total)?;
    let total_fees = add(digging_total, curse_total)?;
    tx.collect(caller, add(total_fees, protocol_fee)?)?;
    tx.state.credit_protocol_fees(protocol_fee)?;

    let custodians: Vec<Address> = commitments.iter().map(|c| c.custodian).collect();
    let resource = Sarcophagus {
        id,
        name: params.name,
        payload_ref: params.payload_ref,
        embalmer: caller,
        recipient: params.recipient,
        resurrection_time: params.resurrection_time,
        previous_rewrap_time: params.creation_time,
        maximum_rewrap_interval: params.maximum_rewrap_interval,
        threshold: params.threshold,
        creation_time: params.creation_time,
        state: ResourceState::Active,
        is_compromised: false,
        is_cleaned: false,
        reveal_mode: params.reveal_mode,
        custodians: custodians.clone(),
    };
    let event = ProtocolEvent::ResourceCreated {
        resource: id,
        embalmer: caller,
        recipient: resource.recipient,
        resurrection_time: resource.resurrection_time,
        custodians,
        total_fees,
        protocol_fee,
    };
    tx.state.insert_resource(resource, records);
    tx.state.emit(event);

    info!(
        "Created resource {} with {} custodians (threshold {}), fees {} + {} protocol",
        id.short(),
        commitments.len(),
        params.threshold,
        total_fees,
        protocol_fee
    );
    Ok(())
}

/// Extend the resurrection time, paying custodians for time served
pub(crate) fn rewrap<L: TokenLedger>(
    tx: &mut Tx<'_, L>,
    caller: Address,
    id: ResourceId,
    new_resurrection_time: u64,
) -> Result<()> {
    let mut resource = tx.state.load_resource(&id)?;
    if caller != resource.embalmer {
        return Err(ProtocolError::NotEmbalmer);
    }
    resource.ensure_live()?;
    if tx.now >= resource.resurrection_time {
        return Err(ProtocolError::ExpiredResource);
    }
    if new_resurrection_time <= tx.now {
        return Err(ProtocolError::NewTimeInPast);
    }
    let config = tx.state.config.clone();
    let limit = config.rewrap_horizon(
        resource.previous_rewrap_time,
        resource.maximum_rewrap_interval,
    );
    if new_resurrection_time > limit {
        return Err(ProtocolError::NewTimeTooFar {
            requested: new_resurrection_time,
            limit,
        });
    }

    let mut records = tx.state.load_records(&id)?;
    let elapsed = tx.now - resource.previous_rewrap_time;
    let unused = resource.resurrection_time - tx.now;
    let new_span = new_resurrection_time - tx.now;
    let mut charge: Amount = 0;
    let mut refund: Amount = 0;

    for record in records.values_mut().filter(|r| !r.is_accused) {
        let reward = record.digging_fee(elapsed)?;
        let digging_fee = record.digging_fee(new_span)?;
        let target = fees::cursed_bond(&config, digging_fee, record.curse_fee)?;

        let profile = tx.state.profile_mut(&record.custodian)?;
        bonds::accrue_reward(profile, reward)?;
        bonds::relock(profile, record, target)?;

        charge = add(charge, digging_fee)?;
        refund = add(refund, record.digging_fee(unused)?)?;
    }

    let protocol_fee = fees::protocol_fee(&config, charge)?;
    let due = add(charge, protocol_fee)?;
    if due >= refund {
        tx.collect(caller, due - refund)?;
    } else {
        tx.pay(caller, refund - due)?;
    }
    tx.state.credit_protocol_fees(protocol_fee)?;

    resource.previous_rewrap_time = tx.now;
    resource.resurrection_time = new_resurrection_time;
    tx.state.store_resource(resource);
    tx.state.store_records(id, records);
    tx.state.emit(ProtocolEvent::ResourceRewrapped {
        resource: id,
        resurrection_time: new_resurrection_time,
        total_fees: charge,
        protocol_fee,
    });

    info!(
        "Rewrapped resource {} until {} (charged {}, refunded {})",
        id.short(),
        new_resurrection_time,
        due,
        refund
    );
    Ok(())
}

/// Retire a resource for good, settling every custodian
pub(crate) fn bury<L: TokenLedger>(
    tx: &mut Tx<'_, L>,
    caller: Address,
    id: ResourceId,
) -> Result<()> {
    let mut resource = tx.state.load_resource(&id)?;
    if caller != resource.embalmer {
        return Err(ProtocolError::NotEmbalmer);
    }
    resource.ensure_live()?;
    if tx.now >= resource.resurrection_time {
        return Err(ProtocolError::ExpiredResource);
    }

    let mut records = tx.state.load_records(&id)?;
    let elapsed = tx.now - resource.previous_rewrap_time;
    let mut refund: Amount = 0;

    for record in records.values_mut().filter(|r| r.is_pending()) {
        let reward = record.digging_fee(elapsed)?;
        let escrow = record.escrowed_fees(&resource)?;

        let profile = tx.state.profile_mut(&record.custodian)?;
        bonds::accrue_reward(profile, reward)?;
        let released = bonds::release(profile, record)?;
        debug!(
            "Released {} bond for custodian {} on burial",
            released,
            record.custodian.short()
        );

        refund = add(refund, escrow.saturating_sub(reward))?;
    }

    tx.pay(caller, refund)?;

    resource.resurrection_time = NEVER;
    resource.state = ResourceState::Done;
    tx.state.store_resource(resource);
    tx.state.store_records(id, records);
    tx.state.emit(ProtocolEvent::ResourceBuried {
        resource: id,
        refund,
    });

    info!("Buried resource {}, refunded {}", id.short(), refund);
    Ok(())
}
