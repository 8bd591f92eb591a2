//! In-memory ledger acting as vault and notary
//!
//! All commits go through one write lock, so checking the inputs and
//! consuming them is atomic: of two transactions spending the same
//! `StateRef`, exactly one wins.

use async_trait::async_trait;
use chrono::Utc;
use iou_ledger::{
    IouContract, IouState, LinearId, Party, PartyKey, SignedTransaction, StateAndRef, StateRef,
    TxId,
};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

use crate::error::{LookupError, NotaryError};
use crate::services::{CommitReceipt, NotaryService, VaultService};

/// Default capacity of the commit announcement channel
pub const COMMIT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct LedgerInner {
    transactions: Vec<SignedTransaction>,
    committed: HashSet<TxId>,
    unconsumed: BTreeMap<StateRef, IouState>,
    consumed: BTreeSet<StateRef>,
}

impl LedgerInner {
    fn apply(&mut self, stx: &SignedTransaction) {
        for input in stx.tx.input_refs() {
            self.unconsumed.remove(input);
            self.consumed.insert(input.clone());
        }
        for output in stx.tx.iou_out_refs() {
            self.unconsumed.insert(output.reference, output.state);
        }
        self.committed.insert(stx.id().clone());
        self.transactions.push(stx.clone());
    }

    fn check_inputs(&self, stx: &SignedTransaction) -> Result<(), NotaryError> {
        let consumed: Vec<StateRef> = stx
            .tx
            .input_refs()
            .filter(|r| self.consumed.contains(*r))
            .cloned()
            .collect();
        if !consumed.is_empty() {
            return Err(NotaryError::Conflict { consumed });
        }

        for input in &stx.tx.inputs {
            match self.unconsumed.get(&input.reference) {
                None => {
                    return Err(NotaryError::Rejected(format!(
                        "Unknown input state {}",
                        input.reference
                    )))
                }
                Some(state) if *state != input.state => {
                    return Err(NotaryError::Rejected(format!(
                        "Input {} does not match the recorded state",
                        input.reference
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Shared ledger; the single authority over which states are current
pub struct InMemoryLedger {
    notary: Party,
    inner: RwLock<LedgerInner>,
    commits: broadcast::Sender<Arc<SignedTransaction>>,
}

impl InMemoryLedger {
    pub fn new(notary: Party) -> Self {
        let (commits, _) = broadcast::channel(COMMIT_CHANNEL_CAPACITY);
        Self {
            notary,
            inner: RwLock::new(LedgerInner::default()),
            commits,
        }
    }

    pub fn notary(&self) -> &Party {
        &self.notary
    }

    /// Receive every transaction committed from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<SignedTransaction>> {
        self.commits.subscribe()
    }

    /// Check and commit a fully-signed transaction
    pub fn commit_transaction(
        &self,
        stx: &SignedTransaction,
    ) -> Result<CommitReceipt, NotaryError> {
        if stx.tx.notary != self.notary {
            return Err(NotaryError::Rejected(format!(
                "Transaction names notary {}, this notary is {}",
                stx.tx.notary, self.notary
            )));
        }
        stx.verify_required_signatures()
            .map_err(|e| NotaryError::Rejected(e.to_string()))?;
        IouContract::verify(&stx.tx).map_err(|e| NotaryError::Rejected(e.to_string()))?;

        {
            let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
            if inner.committed.contains(stx.id()) {
                return Err(NotaryError::Rejected(format!(
                    "Transaction {} already committed",
                    stx.id()
                )));
            }
            if let Err(e) = inner.check_inputs(stx) {
                tracing::warn!(tx_id = %stx.id(), error = %e, "Notary refused commit");
                return Err(e);
            }
            inner.apply(stx);
        }

        tracing::info!(tx_id = %stx.id(), inputs = stx.tx.inputs.len(), "Notarised");
        // No subscribers is fine
        let _ = self.commits.send(Arc::new(stx.clone()));

        Ok(CommitReceipt {
            tx_id: stx.id().clone(),
            notary: self.notary.clone(),
            committed_at: Utc::now(),
        })
    }

    /// Re-apply a transaction committed earlier (journal replay).
    ///
    /// Signatures and contract are not re-checked and no commit is announced;
    /// double spends still fail.
    pub fn record_committed(&self, stx: SignedTransaction) -> Result<(), NotaryError> {
        stx.tx
            .verify_id()
            .map_err(|e| NotaryError::Rejected(e.to_string()))?;

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if inner.committed.contains(stx.id()) {
            return Ok(());
        }
        inner.check_inputs(&stx)?;
        inner.apply(&stx);
        Ok(())
    }

    /// Committed transactions in commit order
    pub fn transactions(&self) -> Vec<SignedTransaction> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.transactions.clone()
    }

    pub fn transaction(&self, tx_id: &TxId) -> Option<SignedTransaction> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .transactions
            .iter()
            .find(|stx| stx.id() == tx_id)
            .cloned()
    }

    /// Every unconsumed IOU, regardless of participant
    pub fn unconsumed_states(&self) -> Vec<StateAndRef> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .unconsumed
            .iter()
            .map(|(reference, state)| StateAndRef {
                state: state.clone(),
                reference: reference.clone(),
            })
            .collect()
    }

    pub fn is_consumed(&self, reference: &StateRef) -> bool {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.consumed.contains(reference)
    }

    /// A vault view limited to IOUs the given key participates in
    pub fn vault_for(self: &Arc<Self>, owner: PartyKey) -> LedgerVault {
        LedgerVault {
            ledger: Arc::clone(self),
            owner,
        }
    }
}

#[async_trait]
impl NotaryService for InMemoryLedger {
    async fn commit(&self, stx: &SignedTransaction) -> Result<CommitReceipt, NotaryError> {
        self.commit_transaction(stx)
    }
}

/// One node's view of the ledger
#[derive(Clone)]
pub struct LedgerVault {
    ledger: Arc<InMemoryLedger>,
    owner: PartyKey,
}

impl LedgerVault {
    fn relevant(&self, state: &IouState) -> bool {
        state.participant_keys().contains(&self.owner)
    }
}

#[async_trait]
impl VaultService for LedgerVault {
    async fn find_current(&self, linear_id: &LinearId) -> Result<StateAndRef, LookupError> {
        let mut matches: Vec<StateAndRef> = self
            .ledger
            .unconsumed_states()
            .into_iter()
            .filter(|s| s.state.linear_id == *linear_id && self.relevant(&s.state))
            .collect();

        match matches.len() {
            0 => Err(LookupError::NotFound(*linear_id)),
            1 => Ok(matches.remove(0)),
            count => Err(LookupError::Ambiguous {
                linear_id: *linear_id,
                count,
            }),
        }
    }

    async fn current_states(&self) -> Vec<StateAndRef> {
        self.ledger
            .unconsumed_states()
            .into_iter()
            .filter(|s| self.relevant(&s.state))
            .collect()
    }
}
