//! Custodian (archaeologist) profile types

use serde::{Deserialize, Serialize};

use sarco_core::{Amount, Timestamp};

/// Terms a custodian declares when registering or updating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodianTerms {
    /// Opaque reachability string (libp2p peer id or similar)
    pub peer_id: String,

    /// Lowest per-second digging fee the custodian accepts
    pub minimum_fee_per_second: Amount,

    /// Longest rewrap interval the custodian accepts
    pub maximum_allowed_interval: u64,

    /// Latest resurrection time the custodian accepts
    pub maximum_allowed_resurrection_timestamp: Timestamp,

    /// One-time fee for publishing
    pub curse_fee: Amount,

    /// Free bond to deposit (added to any existing free bond)
    pub free_bond: Amount,
}

/// Per-custodian profile and bond accounting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodianProfile {
    pub peer_id: String,
    pub minimum_fee_per_second: Amount,
    pub maximum_allowed_interval: u64,
    pub maximum_allowed_resurrection_timestamp: Timestamp,

    /// Bond available to back new resources
    pub free_bond: Amount,

    /// Bond locked as collateral on active resources
    pub cursed_bond: Amount,

    pub curse_fee: Amount,

    /// Fees earned and not yet withdrawn
    pub accrued_rewards: Amount,

    /// Successful publications
    pub successes: u64,

    /// Times accused of leaking
    pub accusals: u64,

    /// Times swept by cleanup for failing to publish
    pub cleanups: u64,
}

impl CustodianProfile {
    /// Create a profile from registration terms
    pub fn from_terms(terms: &CustodianTerms) -> Self {
        Self {
            peer_id: terms.peer_id.clone(),
            minimum_fee_per_second: terms.minimum_fee_per_second,
            maximum_allowed_interval: terms.maximum_allowed_interval,
            maximum_allowed_resurrection_timestamp: terms.maximum_allowed_resurrection_timestamp,
            free_bond: 0,
            cursed_bond: 0,
            curse_fee: terms.curse_fee,
            accrued_rewards: 0,
            successes: 0,
            accusals: 0,
            cleanups: 0,
        }
    }

    /// Replace the declared terms, leaving balances and counters alone
    pub fn apply_terms(&mut self, terms: &CustodianTerms) {
        self.peer_id = terms.peer_id.clone();
        self.minimum_fee_per_second = terms.minimum_fee_per_second;
        self.maximum_allowed_interval = terms.maximum_allowed_interval;
        self.maximum_allowed_resurrection_timestamp = terms.maximum_allowed_resurrection_timestamp;
        self.curse_fee = terms.curse_fee;
    }

    /// Free plus cursed bond
    pub fn total_bond(&self) -> Amount {
        self.free_bond.saturating_add(self.cursed_bond)
    }
}
