//! Fee engine

use sarco_core::Amount;

use crate::config::ProtocolConfig;
use crate::error::{ProtocolError, Result};

/// Protocol fee charged on a digging-fee total
pub fn protocol_fee(config: &ProtocolConfig, digging_fee_total: Amount) -> Result<Amount> {
    percentage(digging_fee_total, config.protocol_fee_base_percentage)
}

/// Bond a custodian must lock to cover `digging_fee + curse_fee`
pub fn cursed_bond(
    config: &ProtocolConfig,
    digging_fee: Amount,
    curse_fee: Amount,
) -> Result<Amount> {
    let base = digging_fee
        .checked_add(curse_fee)
        .ok_or(ProtocolError::ArithmeticOverflow)?;
    percentage(base, config.cursed_bond_percentage)
}

fn percentage(amount: Amount, percent: u64) -> Result<Amount> {
    amount
        .checked_mul(percent as Amount)
        .map(|scaled| scaled / 100)
        .ok_or(ProtocolError::ArithmeticOverflow)
}
