//! Sarco Core - Shared identities, hashing and signature primitives
//!
//! This crate provides the foundational types used by the Sarcophagus
//! escrow protocol: addresses and resource identifiers, key-share
//! commitments, and the signed message custodians produce when they agree
//! to curse a resource.

pub mod crypto;
pub mod error;
pub mod message;
pub mod types;

pub use crypto::{
    double_hash, keccak256, keccak256_multi, EcdsaVerifier, Keypair, PublicKey,
    SignatureVerifier,
};
pub use error::{Error, Result};
pub use message::{Commitment, CommitmentKind, CommitmentMessage};
pub use types::{Address, KeyShare, ResourceId, Signature};

/// Token amounts (bond, fees, rewards)
pub type Amount = u128;

/// Unix timestamp in seconds
pub type Timestamp = u64;

/// Resurrection time of a buried resource
pub const NEVER: Timestamp = u64::MAX;

/// Seconds per hour
pub const HOUR: u64 = 3600;

/// Seconds per day
pub const DAY: u64 = 86400;

/// Seconds per week
pub const WEEK: u64 = 7 * DAY;
