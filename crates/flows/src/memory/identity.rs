//! Party directory and a fixed node identity

use iou_ledger::{Party, PartyKey};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::services::IdentityService;

/// Well-known parties by name, shared by every node of a network
#[derive(Debug, Clone, Default)]
pub struct PartyDirectory {
    parties: Arc<RwLock<BTreeMap<String, Party>>>,
}

impl PartyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, party: Party) {
        self.parties
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(party.name.clone(), party);
    }

    pub fn by_name(&self, name: &str) -> Option<Party> {
        let parties = self.parties.read().unwrap_or_else(|e| e.into_inner());
        parties.get(&name.to_uppercase()).cloned()
    }

    pub fn by_key(&self, key: &PartyKey) -> Option<Party> {
        let parties = self.parties.read().unwrap_or_else(|e| e.into_inner());
        parties.values().find(|p| p.owning_key() == *key).cloned()
    }

    pub fn all(&self) -> Vec<Party> {
        let parties = self.parties.read().unwrap_or_else(|e| e.into_inner());
        parties.values().cloned().collect()
    }
}

/// Identity service of one node
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    me: Party,
    notary: Party,
    directory: PartyDirectory,
}

impl StaticIdentity {
    pub fn new(me: Party, notary: Party, directory: PartyDirectory) -> Self {
        Self {
            me,
            notary,
            directory,
        }
    }
}

impl IdentityService for StaticIdentity {
    fn our_identity(&self) -> Party {
        self.me.clone()
    }

    fn notary(&self) -> Party {
        self.notary.clone()
    }

    fn party_by_name(&self, name: &str) -> Option<Party> {
        self.directory.by_name(name)
    }

    fn party_by_key(&self, key: &PartyKey) -> Option<Party> {
        self.directory.by_key(key)
    }
}
