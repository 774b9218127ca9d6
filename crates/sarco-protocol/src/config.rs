//! Protocol configuration
//!
//! These are the scalars the admin role may tune. They live inside the
//! protocol state so every operation reads the values in force at call time.

use serde::{Deserialize, Serialize};
use std::path::Path;

use sarco_core::{Address, DAY, HOUR, WEEK};

use crate::error::{ProtocolError, Result};

/// Protocol configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Holder of the administrative role
    pub admin: Address,

    /// Protocol fee as a percentage of digging fees
    pub protocol_fee_base_percentage: u64,

    /// Share of a custodian's fees locked as cursed bond, in percent
    pub cursed_bond_percentage: u64,

    /// Seconds after resurrection during which custodians may still publish
    pub grace_period: u64,

    /// Seconds after the grace period during which only the embalmer may clean
    pub embalmer_claim_window: u64,

    /// Maximum age (seconds) of signed creation parameters
    pub expiration_threshold: u64,

    /// Rewrap horizon multiple of the maximum rewrap interval (numerator)
    pub rewrap_horizon_numerator: u64,

    /// Rewrap horizon multiple of the maximum rewrap interval (denominator)
    pub rewrap_horizon_denominator: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            admin: Address::ZERO,
            protocol_fee_base_percentage: 1,
            cursed_bond_percentage: 100,
            grace_period: HOUR,
            embalmer_claim_window: WEEK,
            expiration_threshold: HOUR,
            rewrap_horizon_numerator: 5,
            rewrap_horizon_denominator: 3,
        }
    }
}

impl ProtocolConfig {
    /// Default configuration administered by `admin`
    pub fn with_admin(admin: Address) -> Self {
        Self {
            admin,
            ..Self::default()
        }
    }

    /// Check the values are usable
    pub fn validate(&self) -> Result<()> {
        if self.rewrap_horizon_denominator == 0 {
            return Err(ProtocolError::InvalidConfig(
                "rewrap horizon denominator must be non-zero".to_string(),
            ));
        }
        if self.rewrap_horizon_numerator < self.rewrap_horizon_denominator {
            return Err(ProtocolError::InvalidConfig(
                "rewrap horizon must be at least one maximum interval".to_string(),
            ));
        }
        if self.expiration_threshold == 0 {
            return Err(ProtocolError::InvalidConfig(
                "expiration threshold must be non-zero".to_string(),
            ));
        }
        if self.grace_period > 365 * DAY {
            return Err(ProtocolError::InvalidConfig(format!(
                "grace period of {} seconds is unreasonably long",
                self.grace_period
            )));
        }
        Ok(())
    }

    /// Latest resurrection time a rewrap at `previous_rewrap_time` may set
    pub fn rewrap_horizon(&self, previous_rewrap_time: u64, maximum_rewrap_interval: u64) -> u64 {
        let extension = (maximum_rewrap_interval as u128)
            .saturating_mul(self.rewrap_horizon_numerator as u128)
            / self.rewrap_horizon_denominator.max(1) as u128;
        let extension = u64::try_from(extension).unwrap_or(u64::MAX);
        previous_rewrap_time.saturating_add(extension)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}
