//! Commitments and the signed curse-agreement message
//!
//! A custodian agrees off-chain to curse a resource by signing a typed tuple
//! of terms. The encoding here is positional and fixed-width so the same
//! bytes can be rebuilt by any party without negotiation.

use serde::{Deserialize, Serialize};

use crate::crypto::{double_hash, eth_signed_message_hash, keccak256, PublicKey};
use crate::types::hex_bytes_32;
use crate::{Amount, Timestamp};

/// What kind of secret a custodian reveals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommitmentKind {
    /// A threshold key share, committed to by its double hash
    DoubleHash,
    /// A full private key, committed to by its public key
    PublicKey,
}

/// Value a custodian binds to at creation time and must later open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Commitment {
    /// `keccak256(keccak256(share))`
    DoubleHash(#[serde(with = "hex_bytes_32")] [u8; 32]),
    /// Compressed public key of a per-resource keypair
    PublicKey(PublicKey),
}

impl Commitment {
    /// Commit to a raw key share
    pub fn for_share(share: &[u8]) -> Self {
        Commitment::DoubleHash(double_hash(share))
    }

    pub fn kind(&self) -> CommitmentKind {
        match self {
            Commitment::DoubleHash(_) => CommitmentKind::DoubleHash,
            Commitment::PublicKey(_) => CommitmentKind::PublicKey,
        }
    }

    /// Whether `secret` opens this commitment
    pub fn matches(&self, secret: &[u8]) -> bool {
        match self {
            Commitment::DoubleHash(expected) => double_hash(secret) == *expected,
            Commitment::PublicKey(expected) => {
                matches!(PublicKey::from_private_key(secret), Ok(derived) if derived == *expected)
            }
        }
    }

    /// Tagged byte encoding used inside the signed message
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Commitment::DoubleHash(hash) => {
                let mut out = Vec::with_capacity(33);
                out.push(0x01);
                out.extend_from_slice(hash);
                out
            }
            Commitment::PublicKey(key) => {
                let mut out = Vec::with_capacity(34);
                out.push(0x02);
                out.extend_from_slice(key.as_bytes());
                out
            }
        }
    }

    /// Short display format
    pub fn short(&self) -> String {
        let bytes = self.to_bytes();
        hex::encode(&bytes[1..5])
    }
}

/// The terms a custodian signs when agreeing to curse a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentMessage {
    /// Opaque reference to the encrypted payload (archival transaction id)
    pub payload_ref: String,
    pub commitment: Commitment,
    pub maximum_rewrap_interval: u64,
    pub fee_per_second: Amount,
    pub creation_time: Timestamp,
    pub curse_fee: Amount,
}

impl CommitmentMessage {
    /// Positional encoding of the fields, in declaration order
    pub fn encode(&self) -> Vec<u8> {
        let payload = self.payload_ref.as_bytes();
        let commitment = self.commitment.to_bytes();

        let mut out = Vec::with_capacity(4 + payload.len() + commitment.len() + 8 + 16 + 8 + 16);
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out.extend_from_slice(&commitment);
        out.extend_from_slice(&self.maximum_rewrap_interval.to_be_bytes());
        out.extend_from_slice(&self.fee_per_second.to_be_bytes());
        out.extend_from_slice(&self.creation_time.to_be_bytes());
        out.extend_from_slice(&self.curse_fee.to_be_bytes());
        out
    }

    /// Digest that is actually signed
    pub fn digest(&self) -> [u8; 32] {
        eth_signed_message_hash(&keccak256(&self.encode()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    fn sample() -> CommitmentMessage {
        CommitmentMessage {
            payload_ref: "arweave-tx-1".to_string(),
            commitment: Commitment::for_share(b"share"),
            maximum_rewrap_interval: 30 * 86400,
            fee_per_second: 100,
            creation_time: 1_700_000_000,
            curse_fee: 10,
        }
    }

    #[test]
    fn test_share_commitment_matches_only_its_share() {
        let commitment = Commitment::for_share(b"share");
        assert!(commitment.matches(b"share"));
        assert!(!commitment.matches(b"shard"));
        assert_eq!(commitment.kind(), CommitmentKind::DoubleHash);
    }

    #[test]
    fn test_public_key_commitment_matches_private_key() {
        let keypair = Keypair::generate();
        let commitment = Commitment::PublicKey(keypair.public_key());
        assert!(commitment.matches(&keypair.to_bytes()));
        assert!(!commitment.matches(&Keypair::generate().to_bytes()));
        assert!(!commitment.matches(b"not a key"));
    }

    #[test]
    fn test_every_field_changes_digest() {
        let base = sample().digest();

        let mut m = sample();
        m.payload_ref.push('x');
        assert_ne!(base, m.digest());

        let mut m = sample();
        m.commitment = Commitment::for_share(b"other");
        assert_ne!(base, m.digest());

        let mut m = sample();
        m.maximum_rewrap_interval += 1;
        assert_ne!(base, m.digest());

        let mut m = sample();
        m.fee_per_second += 1;
        assert_ne!(base, m.digest());

        let mut m = sample();
        m.creation_time += 1;
        assert_ne!(base, m.digest());

        let mut m = sample();
        m.curse_fee += 1;
        assert_ne!(base, m.digest());
    }

    #[test]
    fn test_payload_length_prefix_prevents_field_shifting() {
        let mut a = sample();
        a.payload_ref = "ab".to_string();
        let mut b = sample();
        b.payload_ref = "a".to_string();
        assert_ne!(a.encode(), b.encode());
    }

    #[test]
    fn test_commitment_json_shape() {
        let json = serde_json::to_string(&Commitment::DoubleHash([0xaa; 32])).unwrap();
        assert!(json.contains("\"kind\":\"DoubleHash\""));
        let back: Commitment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Commitment::DoubleHash([0xaa; 32]));
    }
}
