//! Digital signatures over transaction ids
//!
//! A party signs the id of a `WireTransaction` together with the signing
//! time. Since the id is a hash of the whole content, the signature covers
//! every input, output and command.

use crate::error::LedgerError;
use crate::party::PartyKey;
use crate::transaction::{TxId, WireTransaction};
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer as DalekSigner, SigningKey, Verifier};
use serde::{Deserialize, Serialize};

/// Signature algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    #[default]
    Ed25519,
}

/// A party's signature over a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignature {
    /// Key that produced the signature
    pub by: PartyKey,

    pub algorithm: SignatureAlgorithm,

    /// Signature bytes (hex-encoded)
    pub signature: String,

    pub signed_at: DateTime<Utc>,
}

impl TransactionSignature {
    /// Verify this signature against a transaction id
    pub fn verify(&self, tx_id: &TxId) -> Result<(), LedgerError> {
        match self.algorithm {
            SignatureAlgorithm::Ed25519 => {
                let sig_bytes = hex::decode(&self.signature).map_err(|e| {
                    LedgerError::InvalidSignature {
                        signer: self.by.to_string(),
                        reason: format!("Invalid signature hex: {}", e),
                    }
                })?;

                let sig_array: [u8; 64] = sig_bytes.try_into().map_err(|_| {
                    LedgerError::InvalidSignature {
                        signer: self.by.to_string(),
                        reason: "Signature must be 64 bytes".to_string(),
                    }
                })?;

                let verifying_key = self.by.verifying_key()?;
                let signature = Signature::from_bytes(&sig_array);
                let payload = SignablePayload::new(tx_id, self.signed_at);

                verifying_key
                    .verify(&payload.to_bytes(), &signature)
                    .map_err(|e| {
                        LedgerError::SignatureVerificationFailed(format!(
                            "Signature from {} failed: {}",
                            self.by, e
                        ))
                    })
            }
        }
    }
}

/// Bytes that are actually signed
#[derive(Debug, Clone)]
pub struct SignablePayload {
    pub tx_id: TxId,
    pub signed_at: DateTime<Utc>,
}

impl SignablePayload {
    pub fn new(tx_id: &TxId, signed_at: DateTime<Utc>) -> Self {
        Self {
            tx_id: tx_id.clone(),
            signed_at,
        }
    }

    /// `<tx id>|<rfc3339 timestamp>`
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{}|{}", self.tx_id, self.signed_at.to_rfc3339()).into_bytes()
    }
}

/// Anything that can sign transactions on behalf of one key
pub trait Signer: Send + Sync {
    fn public_key(&self) -> PartyKey;

    fn sign(&self, tx: &WireTransaction) -> TransactionSignature;
}

/// Ed25519 signer holding a party's private key
pub struct PartySigner {
    signing_key: SigningKey,
}

impl PartySigner {
    /// Create from a 32-byte seed (hex-encoded)
    pub fn from_hex(hex_seed: &str) -> Result<Self, LedgerError> {
        let bytes = hex::decode(hex_seed.trim())
            .map_err(|e| LedgerError::InvalidKey(format!("Invalid seed hex: {}", e)))?;

        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| LedgerError::InvalidKey("Seed must be 32 bytes".to_string()))?;

        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Generate a new random signing key
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Export the seed as hex (for storage)
    pub fn seed_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }
}

impl Signer for PartySigner {
    fn public_key(&self) -> PartyKey {
        PartyKey::from(self.signing_key.verifying_key())
    }

    fn sign(&self, tx: &WireTransaction) -> TransactionSignature {
        let signed_at = Utc::now();
        let payload = SignablePayload::new(&tx.id, signed_at);
        let signature = self.signing_key.sign(&payload.to_bytes());

        TransactionSignature {
            by: self.public_key(),
            algorithm: SignatureAlgorithm::Ed25519,
            signature: hex::encode(signature.to_bytes()),
            signed_at,
        }
    }
}

impl std::fmt::Debug for PartySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartySigner")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}
