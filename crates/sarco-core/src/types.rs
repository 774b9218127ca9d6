//! Core identity newtypes

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::keccak256_multi;
use crate::error::{Error, Result};

/// Account address (20 bytes), the only notion of identity in the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Convert to `0x`-prefixed hex string
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from hex, with or without the `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() != 40 {
            return Err(Error::InvalidLength {
                expected: 20,
                actual: s.len() / 2,
            });
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Short display format (first 4 bytes as hex)
    pub fn short(&self) -> String {
        format!("0x{}", hex::encode(&self.0[..4]))
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl core::str::FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Resource (sarcophagus) identifier - content-derived 32-byte hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(#[serde(with = "hex_bytes_32")] pub [u8; 32]);

impl ResourceId {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive the identifier from the fields that make a resource unique
    pub fn derive(embalmer: &Address, name: &str, payload_ref: &str, creation_time: u64) -> Self {
        Self(keccak256_multi(&[
            b"sarcophagus:",
            embalmer.as_bytes(),
            name.as_bytes(),
            &[0u8],
            payload_ref.as_bytes(),
            &creation_time.to_be_bytes(),
        ]))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Short display format (first 4 bytes as hex)
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl core::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for ResourceId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Raw secret material revealed by a custodian (a key share or a private key)
#[derive(Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct KeyShare(Vec<u8>);

impl KeyShare {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        Ok(Self(hex::decode(s)?))
    }
}

impl core::fmt::Debug for KeyShare {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "KeyShare({} bytes)", self.0.len())
    }
}

impl AsRef<[u8]> for KeyShare {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for KeyShare {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for KeyShare {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// Recoverable ECDSA signature (65 bytes: r || s || v)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 65]);

impl Signature {
    pub fn new(bytes: [u8; 65]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    /// The 64-byte `r || s` part
    pub fn rs(&self) -> &[u8] {
        &self.0[..64]
    }

    /// Recovery id byte
    pub fn v(&self) -> u8 {
        self.0[64]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 65];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 65];
        hex::decode_to_slice(&s, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(Self(bytes))
    }
}

/// Serde helper for 32-byte arrays as hex strings
pub mod hex_bytes_32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&s, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(bytes)
    }
}

/// Serde helper for 33-byte arrays as hex strings
pub mod hex_bytes_33 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 33], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 33], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 33];
        hex::decode_to_slice(&s, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address::new([0xab; 20]);
        let hex = addr.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(Address::from_hex(&hex).unwrap(), addr);
        assert_eq!(Address::from_hex(&hex[2..]).unwrap(), addr);
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        assert!(Address::from_hex("0x1234").is_err());
    }

    #[test]
    fn test_resource_id_depends_on_every_field() {
        let embalmer = Address::new([1; 20]);
        let base = ResourceId::derive(&embalmer, "will", "tx-1", 100);
        assert_ne!(base, ResourceId::derive(&Address::new([2; 20]), "will", "tx-1", 100));
        assert_ne!(base, ResourceId::derive(&embalmer, "will2", "tx-1", 100));
        assert_ne!(base, ResourceId::derive(&embalmer, "will", "tx-2", 100));
        assert_ne!(base, ResourceId::derive(&embalmer, "will", "tx-1", 101));
        assert_eq!(base, ResourceId::derive(&embalmer, "will", "tx-1", 100));
    }

    #[test]
    fn test_key_share_debug_hides_contents() {
        let share = KeyShare::new(vec![0xde, 0xad]);
        assert_eq!(format!("{:?}", share), "KeyShare(2 bytes)");
    }
}
