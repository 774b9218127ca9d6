//! Administrative surface
//!
//! Role-gated setters for the protocol scalars, admin transfer and
//! protocol-fee withdrawal.

use tracing::info;

use sarco_core::{Address, Amount};

use crate::config::ProtocolConfig;
use crate::error::{ProtocolError, Result};
use crate::events::ProtocolEvent;
use crate::ledger::TokenLedger;
use crate::store::{ProtocolState, Tx};

/// Admin-tunable scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    ProtocolFeeBasePercentage,
    CursedBondPercentage,
    GracePeriod,
    EmbalmerClaimWindow,
    ExpirationThreshold,
}

impl ConfigField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigField::ProtocolFeeBasePercentage => "protocol_fee_base_percentage",
            ConfigField::CursedBondPercentage => "cursed_bond_percentage",
            ConfigField::GracePeriod => "grace_period",
            ConfigField::EmbalmerClaimWindow => "embalmer_claim_window",
            ConfigField::ExpirationThreshold => "expiration_threshold",
        }
    }

    fn slot<'a>(&self, config: &'a mut ProtocolConfig) -> &'a mut u64 {
        match self {
            ConfigField::ProtocolFeeBasePercentage => &mut config.protocol_fee_base_percentage,
            ConfigField::CursedBondPercentage => &mut config.cursed_bond_percentage,
            ConfigField::GracePeriod => &mut config.grace_period,
            ConfigField::EmbalmerClaimWindow => &mut config.embalmer_claim_window,
            ConfigField::ExpirationThreshold => &mut config.expiration_threshold,
        }
    }
}

fn ensure_admin(state: &ProtocolState, caller: Address) -> Result<()> {
    if state.config.admin.is_zero() || caller != state.config.admin {
        return Err(ProtocolError::NotAdmin);
    }
    Ok(())
}

pub(crate) fn set_config<L>(
    tx: &mut Tx<'_, L>,
    caller: Address,
    field: ConfigField,
    value: u64,
) -> Result<()> {
    ensure_admin(tx.state, caller)?;
    *field.slot(&mut tx.state.config) = value;
    tx.state.config.validate()?;
    tx.state.emit(ProtocolEvent::ConfigUpdated {
        field: field.as_str().to_string(),
        value,
    });

    info!("Set {} to {}", field.as_str(), value);
    Ok(())
}

pub(crate) fn set_rewrap_horizon<L>(
    tx: &mut Tx<'_, L>,
    caller: Address,
    numerator: u64,
    denominator: u64,
) -> Result<()> {
    ensure_admin(tx.state, caller)?;
    tx.state.config.rewrap_horizon_numerator = numerator;
    tx.state.config.rewrap_horizon_denominator = denominator;
    tx.state.config.validate()?;
    tx.state.emit(ProtocolEvent::ConfigUpdated {
        field: "rewrap_horizon_numerator".to_string(),
        value: numerator,
    });
    tx.state.emit(ProtocolEvent::ConfigUpdated {
        field: "rewrap_horizon_denominator".to_string(),
        value: denominator,
    });

    info!("Set rewrap horizon to {}/{}", numerator, denominator);
    Ok(())
}

pub(crate) fn transfer_admin<L>(tx: &mut Tx<'_, L>, caller: Address, admin: Address) -> Result<()> {
    ensure_admin(tx.state, caller)?;
    if admin.is_zero() {
        return Err(ProtocolError::InvalidConfig(
            "admin must be a non-zero address".to_string(),
        ));
    }
    let previous = tx.state.config.admin;
    tx.state.config.admin = admin;
    tx.state.emit(ProtocolEvent::AdminTransferred { previous, admin });

    info!("Admin role moved from {} to {}", previous.short(), admin.short());
    Ok(())
}

pub(crate) fn withdraw_protocol_fees<L: TokenLedger>(
    tx: &mut Tx<'_, L>,
    caller: Address,
    to: Address,
) -> Result<Amount> {
    ensure_admin(tx.state, caller)?;
    let amount = tx.state.total_protocol_fees;
    if amount == 0 {
        return Err(ProtocolError::NothingToWithdraw);
    }
    tx.state.total_protocol_fees = 0;
    tx.pay(to, amount)?;
    tx.state.emit(ProtocolEvent::ProtocolFeesWithdrawn { to, amount });

    info!("Withdrew {} protocol fees to {}", amount, to.short());
    Ok(amount)
}
