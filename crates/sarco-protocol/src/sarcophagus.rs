//! Resource (sarcophagus) and bonded-custodian record types

use serde::{Deserialize, Serialize};

use sarco_core::{
    Address, Amount, Commitment, CommitmentKind, CommitmentMessage, KeyShare, ResourceId,
    Signature, Timestamp,
};

use crate::error::{ProtocolError, Result};

/// Lifecycle state of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    /// Awaiting resurrection, rewrap or burial
    Active,
    /// Terminal: buried, compromised or cleaned
    Done,
}

/// How custodians reveal their secret for a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevealMode {
    /// Each custodian publishes a threshold share, committed by double hash
    KeyShare,
    /// Each custodian publishes a full per-resource private key
    PrivateKey,
}

impl RevealMode {
    /// Commitment kind custodians must sign for this mode
    pub fn commitment_kind(&self) -> CommitmentKind {
        match self {
            RevealMode::KeyShare => CommitmentKind::DoubleHash,
            RevealMode::PrivateKey => CommitmentKind::PublicKey,
        }
    }
}

impl std::fmt::Display for RevealMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RevealMode::KeyShare => write!(f, "key-share"),
            RevealMode::PrivateKey => write!(f, "private-key"),
        }
    }
}

/// A protected resource and its lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sarcophagus {
    pub id: ResourceId,
    pub name: String,

    /// Opaque archival transaction id of the encrypted payload
    pub payload_ref: String,

    pub embalmer: Address,
    pub recipient: Address,

    /// `NEVER` once buried
    pub resurrection_time: Timestamp,
    pub previous_rewrap_time: Timestamp,
    pub maximum_rewrap_interval: u64,

    /// Shares needed to reconstruct the secret (and accusals to compromise it)
    pub threshold: u32,

    pub creation_time: Timestamp,
    pub state: ResourceState,
    pub is_compromised: bool,
    pub is_cleaned: bool,
    pub reveal_mode: RevealMode,

    /// Bonded custodians in creation order
    pub custodians: Vec<Address>,
}

impl Sarcophagus {
    /// Active and not compromised
    pub fn is_live(&self) -> bool {
        self.state == ResourceState::Active && !self.is_compromised
    }

    /// Require a live resource, reporting compromise before inactivity
    pub fn ensure_live(&self) -> Result<()> {
        if self.is_compromised {
            return Err(ProtocolError::Compromised);
        }
        if self.state != ResourceState::Active {
            return Err(ProtocolError::Inactive);
        }
        Ok(())
    }

    /// Whether fees and bonds on this resource are still held in escrow
    pub fn holds_escrow(&self) -> bool {
        self.is_live() && !self.is_cleaned
    }

    /// End of the publication grace period
    pub fn grace_end(&self, grace_period: u64) -> Timestamp {
        self.resurrection_time.saturating_add(grace_period)
    }

    /// End of the embalmer's exclusive cleanup window
    pub fn claim_window_end(&self, grace_period: u64, claim_window: u64) -> Timestamp {
        self.grace_end(grace_period).saturating_add(claim_window)
    }
}

/// One custodian's binding to one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondedCustodianRecord {
    pub custodian: Address,
    pub fee_per_second: Amount,
    pub curse_fee: Amount,
    pub commitment: Commitment,

    /// Revealed secret, absent until published
    pub raw_key_share: Option<KeyShare>,

    /// Bond currently locked for this record
    pub cursed_bond: Amount,

    pub is_accused: bool,
    pub has_published: bool,
}

impl BondedCustodianRecord {
    /// Neither published nor accused
    pub fn is_pending(&self) -> bool {
        !self.is_accused && !self.has_published
    }

    /// Digging fee for `seconds` of custody
    pub fn digging_fee(&self, seconds: u64) -> Result<Amount> {
        self.fee_per_second
            .checked_mul(seconds as Amount)
            .ok_or(ProtocolError::ArithmeticOverflow)
    }

    /// Fees still held in escrow for a pending record: the digging fee from
    /// the last rewrap to resurrection plus the curse fee
    pub fn escrowed_fees(&self, resource: &Sarcophagus) -> Result<Amount> {
        let span = resource
            .resurrection_time
            .saturating_sub(resource.previous_rewrap_time);
        self.digging_fee(span)?
            .checked_add(self.curse_fee)
            .ok_or(ProtocolError::ArithmeticOverflow)
    }
}

/// Embalmer-chosen parameters for a new resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateParams {
    pub name: String,
    pub payload_ref: String,
    pub recipient: Address,
    pub resurrection_time: Timestamp,
    pub maximum_rewrap_interval: u64,
    pub threshold: u32,

    /// Time the off-chain negotiation was signed
    pub creation_time: Timestamp,
    pub reveal_mode: RevealMode,
}

/// A custodian's signed agreement to curse a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodianCommitment {
    pub custodian: Address,
    pub fee_per_second: Amount,
    pub curse_fee: Amount,
    pub commitment: Commitment,
    pub signature: Signature,
}

impl CustodianCommitment {
    /// The message the custodian must have signed for `params`
    pub fn message(&self, params: &CreateParams) -> CommitmentMessage {
        CommitmentMessage {
            payload_ref: params.payload_ref.clone(),
            commitment: self.commitment,
            maximum_rewrap_interval: params.maximum_rewrap_interval,
            fee_per_second: self.fee_per_second,
            creation_time: params.creation_time,
            curse_fee: self.curse_fee,
        }
    }
}

/// Result of an `accuse` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccusalOutcome {
    /// Custodians accused by this call
    pub newly_accused: Vec<Address>,

    /// Total accused custodians on the resource after this call
    pub total_accused: u32,

    /// Whether this call compromised the resource
    pub compromised: bool,

    /// Bond paid to the beneficiary
    pub beneficiary_payout: Amount,

    /// Bond share plus fee refunds paid to the embalmer
    pub embalmer_payout: Amount,
}
