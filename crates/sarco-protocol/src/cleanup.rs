//! Cleanup engine
//!
//! After the grace period, custodians that never published forfeit their
//! bond and escrowed fees. The embalmer may claim them during the claim
//! window; once it closes the admin sweeps them into protocol fees.

use tracing::{info, warn};

use sarco_core::{Address, Amount, ResourceId};

use crate::bonds;
use crate::error::{ProtocolError, Result};
use crate::events::ProtocolEvent;
use crate::ledger::TokenLedger;
use crate::sarcophagus::ResourceState;
use crate::store::{add, Tx};

/// Where cleanup proceeds go
enum Proceeds {
    Account(Address),
    ProtocolFees,
}

/// Sweep non-publishing custodians; returns the total swept
pub(crate) fn clean<L: TokenLedger>(
    tx: &mut Tx<'_, L>,
    caller: Address,
    id: ResourceId,
    beneficiary: Address,
) -> Result<Amount> {
    let mut resource = tx.state.load_resource(&id)?;
    if resource.is_compromised {
        return Err(ProtocolError::Compromised);
    }
    if resource.is_cleaned {
        return Err(ProtocolError::AlreadyCleaned);
    }
    if resource.state != ResourceState::Active {
        return Err(ProtocolError::Inactive);
    }

    let config = &tx.state.config;
    let grace_end = resource.grace_end(config.grace_period);
    let window_end = resource.claim_window_end(config.grace_period, config.embalmer_claim_window);
    let proceeds = if caller == resource.embalmer {
        if tx.now < grace_end {
            return Err(ProtocolError::TooEarly);
        }
        if tx.now >= window_end {
            return Err(ProtocolError::ClaimWindowPassed);
        }
        Proceeds::Account(beneficiary)
    } else if !config.admin.is_zero() && caller == config.admin {
        if tx.now < window_end {
            return Err(ProtocolError::TooEarlyForAdminClean);
        }
        Proceeds::ProtocolFees
    } else {
        return Err(ProtocolError::NotEmbalmerOrAdmin);
    };

    let mut records = tx.state.load_records(&id)?;
    let mut slashed_total: Amount = 0;
    let mut fees_total: Amount = 0;
    for record in records.values_mut().filter(|r| r.is_pending()) {
        let escrow = record.escrowed_fees(&resource)?;
        let profile = tx.state.profile_mut(&record.custodian)?;
        let slashed = bonds::forfeit(profile, record);
        profile.cleanups += 1;

        warn!(
            "Custodian {} failed to publish for resource {}, slashed {}",
            record.custodian.short(),
            id.short(),
            slashed
        );
        slashed_total = add(slashed_total, slashed)?;
        fees_total = add(fees_total, escrow)?;
    }

    let swept = add(slashed_total, fees_total)?;
    let destination = match proceeds {
        Proceeds::Account(to) => {
            tx.pay(to, swept)?;
            to
        }
        Proceeds::ProtocolFees => {
            tx.state.credit_protocol_fees(swept)?;
            tx.state.custody
        }
    };

    resource.is_cleaned = true;
    resource.state = ResourceState::Done;
    tx.state.store_resource(resource);
    tx.state.store_records(id, records);
    tx.state.emit(ProtocolEvent::ResourceCleaned {
        resource: id,
        cleaner: caller,
        destination,
        slashed: slashed_total,
        fees: fees_total,
    });

    info!(
        "Cleaned resource {}: swept {} to {}",
        id.short(),
        swept,
        destination.short()
    );
    Ok(swept)
}
