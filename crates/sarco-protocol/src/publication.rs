//! Publication engine
//!
//! Custodians reveal their secret between the resurrection time and the end
//! of the grace period. A valid reveal releases the record's bond and pays
//! the escrowed fees as reward.

use tracing::{info, warn};

use sarco_core::{Address, Amount, KeyShare, ResourceId};

use crate::bonds;
use crate::error::{ProtocolError, Result};
use crate::events::ProtocolEvent;
use crate::ledger::TokenLedger;
use crate::sarcophagus::RevealMode;
use crate::store::Tx;

/// Publish `secret` for `caller`'s record; returns the reward accrued
pub(crate) fn publish<L: TokenLedger>(
    tx: &mut Tx<'_, L>,
    caller: Address,
    id: ResourceId,
    secret: KeyShare,
    mode: RevealMode,
) -> Result<Amount> {
    let resource = tx.state.load_resource(&id)?;
    resource.ensure_live()?;
    if tx.now < resource.resurrection_time {
        return Err(ProtocolError::TooEarly);
    }
    if tx.now >= resource.grace_end(tx.state.config.grace_period) {
        return Err(ProtocolError::TooLate);
    }
    if resource.reveal_mode != mode {
        return Err(ProtocolError::WrongRevealMode);
    }

    let mut records = tx.state.load_records(&id)?;
    let record = records
        .get_mut(&caller)
        .ok_or(ProtocolError::NotOnResource(caller))?;
    if record.is_accused {
        return Err(ProtocolError::AlreadyAccused);
    }
    if record.has_published {
        return Err(ProtocolError::AlreadyPublished);
    }
    if !record.commitment.matches(secret.as_bytes()) {
        warn!(
            "Custodian {} published a secret that does not open commitment {}",
            caller.short(),
            record.commitment.short()
        );
        return Err(ProtocolError::HashMismatch);
    }

    let reward = record.escrowed_fees(&resource)?;
    let profile = tx.state.profile_mut(&caller)?;
    bonds::release(profile, record)?;
    bonds::accrue_reward(profile, reward)?;
    profile.successes += 1;

    record.raw_key_share = Some(secret);
    record.has_published = true;
    tx.state.store_records(id, records);

    let event = match mode {
        RevealMode::KeyShare => ProtocolEvent::KeySharePublished {
            resource: id,
            custodian: caller,
            reward,
        },
        RevealMode::PrivateKey => ProtocolEvent::PrivateKeyPublished {
            resource: id,
            custodian: caller,
            reward,
        },
    };
    tx.state.emit(event);

    info!(
        "Custodian {} published {} for resource {}, reward {}",
        caller.short(),
        mode,
        id.short(),
        reward
    );
    Ok(reward)
}
