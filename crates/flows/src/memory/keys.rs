//! Key store backing a node's signing service

use iou_ledger::{Party, PartyKey, PartySigner, Signer, TransactionSignature, WireTransaction};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::SigningError;
use crate::services::SigningService;

/// Ed25519 keys held by one node
#[derive(Debug, Default)]
pub struct KeyStore {
    signers: RwLock<HashMap<PartyKey, PartySigner>>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a signer, returning its public key
    pub fn insert(&self, signer: PartySigner) -> PartyKey {
        let key = signer.public_key();
        self.signers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, signer);
        key
    }

    pub fn contains(&self, key: &PartyKey) -> bool {
        self.signers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }
}

impl SigningService for KeyStore {
    fn sign(
        &self,
        tx: &WireTransaction,
        as_party: &Party,
    ) -> Result<TransactionSignature, SigningError> {
        let key = as_party.owning_key();
        let signers = self.signers.read().unwrap_or_else(|e| e.into_inner());
        let signer = signers.get(&key).ok_or(SigningError::UnknownKey(key))?;
        Ok(signer.sign(tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iou_ledger::{Command, TransactionBuilder};

    #[test]
    fn test_signs_only_for_held_keys() {
        let store = KeyStore::new();
        let key = store.insert(PartySigner::generate());
        let stranger = PartySigner::generate().public_key();
        assert!(store.contains(&key));

        let notary = Party::new("NOTARY", PartySigner::generate().public_key());
        let tx = TransactionBuilder::new(notary)
            .command(Command::issue([key]))
            .build()
            .unwrap();

        let signature = store.sign(&tx, &Party::new("ALICE", key)).unwrap();
        assert!(signature.verify(&tx.id).is_ok());

        assert_eq!(
            store.sign(&tx, &Party::new("EVE", stranger)),
            Err(SigningError::UnknownKey(stranger))
        );
    }
}
