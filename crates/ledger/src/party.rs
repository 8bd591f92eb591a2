//! Parties and their public keys

use crate::error::LedgerError;
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Ed25519 public key of a party.
///
/// Serialized as lowercase hex. Ordered by bytes so that signer sets
/// (`BTreeSet<PartyKey>`) iterate deterministically.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartyKey([u8; 32]);

impl PartyKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, LedgerError> {
        // Reject byte strings that are not a curve point up front
        VerifyingKey::from_bytes(&bytes).map_err(|e| LedgerError::InvalidKey(e.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn verifying_key(&self) -> Result<VerifyingKey, LedgerError> {
        VerifyingKey::from_bytes(&self.0).map_err(|e| LedgerError::InvalidKey(e.to_string()))
    }
}

impl From<VerifyingKey> for PartyKey {
    fn from(key: VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

impl FromStr for PartyKey {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| LedgerError::InvalidKey(format!("Invalid key hex: {}", e)))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| LedgerError::InvalidKey("Public key must be 32 bytes".to_string()))?;
        Self::from_bytes(array)
    }
}

impl TryFrom<String> for PartyKey {
    type Error = LedgerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PartyKey> for String {
    fn from(key: PartyKey) -> Self {
        key.to_hex()
    }
}

impl fmt::Display for PartyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough to tell parties apart in logs
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl fmt::Debug for PartyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartyKey({})", self)
    }
}

/// A legal identity on the network: a name plus its signing key.
///
/// Identity is the owning key. The name is for display only, so two
/// parties with the same key compare equal whatever they are called.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub key: PartyKey,
}

impl Party {
    pub fn new(name: impl Into<String>, key: PartyKey) -> Self {
        Self {
            name: name.into().to_uppercase(),
            key,
        }
    }

    pub fn owning_key(&self) -> PartyKey {
        self.key
    }
}

impl PartialEq for Party {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Party {}

impl Hash for Party {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
