//! Cryptographic primitives for Sarco
//!
//! Hashing is keccak256 throughout. Custodians sign with secp256k1 and are
//! identified by the Ethereum-style address of their public key, so a
//! signature is checked by recovering the signer and comparing addresses.

use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::error::{Error, Result};
use crate::types::{hex_bytes_33, Address, Signature};

/// Compute keccak256 of a single input
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute keccak256 of multiple inputs concatenated
pub fn keccak256_multi(inputs: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize().into()
}

/// Hash of the hash of a raw key share, the value bound at creation time
pub fn double_hash(share: &[u8]) -> [u8; 32] {
    keccak256(&keccak256(share))
}

/// Wrap a 32-byte digest in the `personal_sign` envelope
pub fn eth_signed_message_hash(digest: &[u8; 32]) -> [u8; 32] {
    keccak256_multi(&[b"\x19Ethereum Signed Message:\n32", digest])
}

fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 SEC1 tag, keep the last 20 bytes of the hash
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address::new(bytes)
}

/// Compressed secp256k1 public key (33 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "hex_bytes_33")] pub [u8; 33]);

impl PublicKey {
    /// Create a new PublicKey from compressed bytes
    pub fn new(bytes: [u8; 33]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 33];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Derive the public key belonging to a raw 32-byte private key
    pub fn from_private_key(secret: &[u8]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(secret)
            .map_err(|e| Error::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_verifying_key(signing_key.verifying_key()))
    }

    fn from_verifying_key(key: &VerifyingKey) -> Self {
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(key.to_encoded_point(true).as_bytes());
        Self(bytes)
    }

    /// Address controlled by this key
    pub fn to_address(&self) -> Result<Address> {
        let key = VerifyingKey::from_sec1_bytes(&self.0)
            .map_err(|e| Error::InvalidPublicKey(e.to_string()))?;
        Ok(address_of(&key))
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Checks that `signature` over `digest` was produced by `signer`.
///
/// The protocol treats this as an external collaborator; `EcdsaVerifier`
/// is the production implementation.
pub trait SignatureVerifier {
    fn verify(&self, digest: &[u8; 32], signer: &Address, signature: &Signature) -> bool;
}

/// secp256k1 recovery-based verifier
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaVerifier;

impl EcdsaVerifier {
    /// Recover the address that produced `signature` over `digest`
    pub fn recover(digest: &[u8; 32], signature: &Signature) -> Result<Address> {
        let sig = K256Signature::from_slice(signature.rs())
            .map_err(|e| Error::InvalidSignature(e.to_string()))?;
        // Accept both raw (0/1) and Ethereum-style (27/28) recovery bytes
        let v = match signature.v() {
            v @ (0 | 1) => v,
            v @ (27 | 28) => v - 27,
            other => {
                return Err(Error::InvalidSignature(format!(
                    "invalid recovery byte {}",
                    other
                )))
            }
        };
        let recovery_id = RecoveryId::from_byte(v)
            .ok_or_else(|| Error::InvalidSignature(format!("invalid recovery id {}", v)))?;
        let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
            .map_err(|e| Error::InvalidSignature(e.to_string()))?;
        Ok(address_of(&key))
    }
}

impl SignatureVerifier for EcdsaVerifier {
    fn verify(&self, digest: &[u8; 32], signer: &Address, signature: &Signature) -> bool {
        matches!(Self::recover(digest, signature), Ok(recovered) if recovered == *signer)
    }
}

/// A secp256k1 signing key held by an off-chain party (custodian agent,
/// embalmer tooling, tests)
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a fresh random keypair
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut rand::rngs::OsRng),
        }
    }

    /// Load a keypair from a raw 32-byte secret
    pub fn from_bytes(secret: &[u8]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(secret)
            .map_err(|e| Error::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { signing_key })
    }

    /// Raw secret bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(self.signing_key.verifying_key())
    }

    pub fn address(&self) -> Address {
        address_of(self.signing_key.verifying_key())
    }

    /// Sign a 32-byte digest, producing an `r || s || v` signature
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature> {
        let (sig, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| Error::Signing(e.to_string()))?;
        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&sig.to_bytes());
        bytes[64] = recovery_id.to_byte();
        Ok(Signature::new(bytes))
    }
}

impl core::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
