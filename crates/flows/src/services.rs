//! Collaborator interfaces consumed by the flows
//!
//! Flows never own ledger state. They read snapshots through
//! [`VaultService`], talk to counterparties through [`SessionTransport`]
//! and hand fully-signed transactions to the [`NotaryService`], which alone
//! decides whether an input is still unconsumed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use iou_ledger::{
    LinearId, Party, PartyKey, SignedTransaction, StateAndRef, TransactionSignature, TxId,
    WireTransaction,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::FlowConfig;
use crate::error::{LookupError, NotaryError, SessionError, SigningError};

/// Current-state lookup
#[async_trait]
pub trait VaultService: Send + Sync {
    /// The single unconsumed version of an IOU
    async fn find_current(&self, linear_id: &LinearId) -> Result<StateAndRef, LookupError>;

    /// All unconsumed IOUs visible to this node
    async fn current_states(&self) -> Vec<StateAndRef>;
}

/// Who we are, who the notary is, and how to resolve other parties
pub trait IdentityService: Send + Sync {
    fn our_identity(&self) -> Party;

    fn notary(&self) -> Party;

    fn party_by_name(&self, name: &str) -> Option<Party>;

    fn party_by_key(&self, key: &PartyKey) -> Option<Party>;
}

/// Produces signatures for keys this node holds
pub trait SigningService: Send + Sync {
    fn sign(&self, tx: &WireTransaction, as_party: &Party)
        -> Result<TransactionSignature, SigningError>;
}

/// Payloads exchanged in a counter-signing session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum FlowMessage {
    /// Transaction the initiator asks to be countersigned
    Proposal(SignedTransaction),
    Signature(TransactionSignature),
    /// Responder declined; carries the reason
    Refused(String),
}

/// One open conversation with a counterparty
#[async_trait]
pub trait FlowSession: Send {
    fn counterparty(&self) -> &Party;

    async fn send(&mut self, message: FlowMessage) -> Result<(), SessionError>;

    async fn receive(&mut self) -> Result<FlowMessage, SessionError>;
}

#[async_trait]
pub trait SessionTransport: Send + Sync {
    async fn open_session(&self, counterparty: &Party)
        -> Result<Box<dyn FlowSession>, SessionError>;
}

/// Proof that a transaction was ordered and its inputs consumed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub tx_id: TxId,
    pub notary: Party,
    pub committed_at: DateTime<Utc>,
}

#[async_trait]
pub trait NotaryService: Send + Sync {
    async fn commit(&self, stx: &SignedTransaction) -> Result<CommitReceipt, NotaryError>;
}

/// Everything a flow needs from the node it runs on
#[derive(Clone)]
pub struct ServiceHub {
    pub identity: Arc<dyn IdentityService>,
    pub vault: Arc<dyn VaultService>,
    pub signing: Arc<dyn SigningService>,
    pub transport: Arc<dyn SessionTransport>,
    pub notary: Arc<dyn NotaryService>,
    pub config: FlowConfig,
}

impl ServiceHub {
    pub fn our_identity(&self) -> Party {
        self.identity.our_identity()
    }

    pub fn sign(&self, tx: &WireTransaction) -> Result<TransactionSignature, SigningError> {
        self.signing.sign(tx, &self.our_identity())
    }
}

impl std::fmt::Debug for ServiceHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHub")
            .field("identity", &self.identity.our_identity().name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
