//! Protocol event log
//!
//! Every committed state change appends one or more events. Failed
//! operations leave no trace here.

use serde::{Deserialize, Serialize};

use sarco_core::{Address, Amount, ResourceId, Timestamp};

/// A committed state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolEvent {
    CustodianRegistered {
        custodian: Address,
        peer_id: String,
        free_bond: Amount,
    },
    CustodianUpdated {
        custodian: Address,
        top_up: Amount,
    },
    FreeBondDeposited {
        custodian: Address,
        amount: Amount,
    },
    FreeBondWithdrawn {
        custodian: Address,
        amount: Amount,
    },
    RewardsWithdrawn {
        custodian: Address,
        amount: Amount,
    },
    ResourceCreated {
        resource: ResourceId,
        embalmer: Address,
        recipient: Address,
        resurrection_time: Timestamp,
        custodians: Vec<Address>,
        total_fees: Amount,
        protocol_fee: Amount,
    },
    ResourceRewrapped {
        resource: ResourceId,
        resurrection_time: Timestamp,
        total_fees: Amount,
        protocol_fee: Amount,
    },
    ResourceBuried {
        resource: ResourceId,
        refund: Amount,
    },
    KeySharePublished {
        resource: ResourceId,
        custodian: Address,
        reward: Amount,
    },
    PrivateKeyPublished {
        resource: ResourceId,
        custodian: Address,
        reward: Amount,
    },
    CustodianAccused {
        resource: ResourceId,
        custodian: Address,
        accuser: Address,
        beneficiary: Address,
        slashed: Amount,
    },
    ResourceCompromised {
        resource: ResourceId,
        released: Vec<Address>,
    },
    ResourceCleaned {
        resource: ResourceId,
        cleaner: Address,
        destination: Address,
        slashed: Amount,
        fees: Amount,
    },
    ProtocolFeesWithdrawn {
        to: Address,
        amount: Amount,
    },
    ConfigUpdated {
        field: String,
        value: u64,
    },
    AdminTransferred {
        previous: Address,
        admin: Address,
    },
}

impl ProtocolEvent {
    /// Resource the event concerns, if any
    pub fn resource(&self) -> Option<ResourceId> {
        use ProtocolEvent::*;
        match self {
            ResourceCreated { resource, .. }
            | ResourceRewrapped { resource, .. }
            | ResourceBuried { resource, .. }
            | KeySharePublished { resource, .. }
            | PrivateKeyPublished { resource, .. }
            | CustodianAccused { resource, .. }
            | ResourceCompromised { resource, .. }
            | ResourceCleaned { resource, .. } => Some(*resource),
            _ => None,
        }
    }

    /// Short event name for display
    pub fn name(&self) -> &'static str {
        use ProtocolEvent::*;
        match self {
            CustodianRegistered { .. } => "custodian_registered",
            CustodianUpdated { .. } => "custodian_updated",
            FreeBondDeposited { .. } => "free_bond_deposited",
            FreeBondWithdrawn { .. } => "free_bond_withdrawn",
            RewardsWithdrawn { .. } => "rewards_withdrawn",
            ResourceCreated { .. } => "resource_created",
            ResourceRewrapped { .. } => "resource_rewrapped",
            ResourceBuried { .. } => "resource_buried",
            KeySharePublished { .. } => "key_share_published",
            PrivateKeyPublished { .. } => "private_key_published",
            CustodianAccused { .. } => "custodian_accused",
            ResourceCompromised { .. } => "resource_compromised",
            ResourceCleaned { .. } => "resource_cleaned",
            ProtocolFeesWithdrawn { .. } => "protocol_fees_withdrawn",
            ConfigUpdated { .. } => "config_updated",
            AdminTransferred { .. } => "admin_transferred",
        }
    }
}
