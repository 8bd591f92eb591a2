//! Application context - wires everything together
//!
//! All parties run in this process over one in-memory network. The journal
//! is the source of truth: on startup it is replayed into the ledger, and
//! every commit announced by the notary is appended to it.

use iou_core::Money;
use iou_flows::memory::{InMemoryLedger, InMemoryNetwork};
use iou_flows::{FlowError, IssueFlow, NotaryError, TransferFlow};
use iou_journal::{JournalError, JournalReader, TransactionJournal};
use iou_ledger::{
    IouContract, LedgerError, LinearId, Party, Signer, SignedTransaction, StateAndRef,
};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::NodeConfig;
use crate::keys;

/// Application context
pub struct AppContext {
    config: NodeConfig,
    network: InMemoryNetwork,
    journal: TransactionJournal,
    replayed: usize,
}

impl AppContext {
    /// Open the data directory and rebuild the ledger from the journal
    pub fn new(config: NodeConfig) -> Result<Self, CommandError> {
        std::fs::create_dir_all(config.journal_path())?;

        let notary_signer = keys::load_or_create(&config.keys_path(), &config.notary_name)?;
        let notary = Party::new(&config.notary_name, notary_signer.public_key());
        let ledger = Arc::new(InMemoryLedger::new(notary));

        let transactions = JournalReader::from_directory(config.journal_path())?.transactions()?;
        let replayed = transactions.len();
        for stx in transactions {
            ledger.record_committed(stx)?;
        }
        tracing::info!(transactions = replayed, "Replayed journal");

        let network = InMemoryNetwork::with_ledger(ledger, config.flow.clone());
        let journal = TransactionJournal::open(config.journal_path())?;

        Ok(Self {
            config,
            network,
            journal,
            replayed,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn network(&self) -> &InMemoryNetwork {
        &self.network
    }

    /// Number of journaled transactions replayed at startup
    pub fn replayed(&self) -> usize {
        self.replayed
    }

    /// Resolve a party by name, bringing its node online on first use
    pub fn party(&self, name: &str) -> Result<Party, CommandError> {
        if name.eq_ignore_ascii_case(&self.config.notary_name) {
            return Err(CommandError::ReservedName(name.to_string()));
        }
        if let Some(party) = self.network.directory().by_name(name) {
            return Ok(party);
        }

        let signer = keys::load_or_create(&self.config.keys_path(), name)?;
        Ok(self.network.add_party(name, signer))
    }

    /// `lender` lends `amount` to `borrower`
    pub async fn issue(
        &mut self,
        lender: &str,
        borrower: &str,
        amount: Money,
    ) -> Result<SignedTransaction, CommandError> {
        let lender = self.party(lender)?;
        let borrower = self.party(borrower)?;
        let hub = self.hub(&lender)?;

        let commits = self.network.ledger().subscribe();
        let result = IssueFlow::new(hub).call(amount, borrower).await;
        self.journal_commits(commits)?;
        Ok(result?)
    }

    /// `caller` moves its lender position on `linear_id` to `new_lender`
    pub async fn transfer(
        &mut self,
        caller: &str,
        linear_id: LinearId,
        new_lender: &str,
    ) -> Result<SignedTransaction, CommandError> {
        let caller = self.party(caller)?;
        let new_lender = self.party(new_lender)?;
        let hub = self.hub(&caller)?;

        let commits = self.network.ledger().subscribe();
        let result = TransferFlow::new(hub).call(linear_id, new_lender).await;
        self.journal_commits(commits)?;
        Ok(result?)
    }

    /// Every unconsumed IOU
    pub fn current_states(&self) -> Vec<StateAndRef> {
        self.network.ledger().unconsumed_states()
    }

    /// Unconsumed IOUs a party participates in
    pub async fn states_of(&self, name: &str) -> Result<Vec<StateAndRef>, CommandError> {
        let party = self.party(name)?;
        Ok(self.hub(&party)?.vault.current_states().await)
    }

    /// Re-verify every journaled transaction and replay it into a fresh ledger
    pub fn audit(&self) -> Result<AuditReport, CommandError> {
        let records = JournalReader::from_directory(self.config.journal_path())?.read_all()?;
        let scratch = InMemoryLedger::new(self.network.notary());
        let mut report = AuditReport {
            checked: records.len(),
            failures: Vec::new(),
        };

        for record in records {
            let stx = &record.transaction;
            let outcome = stx
                .verify_required_signatures()
                .map_err(|e| e.to_string())
                .and_then(|_| IouContract::verify(&stx.tx).map_err(|e| e.to_string()))
                .and_then(|_| {
                    scratch
                        .record_committed(stx.clone())
                        .map_err(|e| e.to_string())
                });

            if let Err(reason) = outcome {
                tracing::warn!(sequence = record.sequence, tx_id = %stx.id(), reason = %reason, "Audit failure");
                report.failures.push(AuditFailure {
                    sequence: record.sequence,
                    tx_id: stx.id().to_string(),
                    reason,
                });
            }
        }

        Ok(report)
    }

    fn hub(&self, party: &Party) -> Result<iou_flows::ServiceHub, CommandError> {
        self.network
            .hub(party)
            .ok_or_else(|| CommandError::UnknownParty(party.name.clone()))
    }

    fn journal_commits(
        &mut self,
        mut commits: broadcast::Receiver<Arc<SignedTransaction>>,
    ) -> Result<(), CommandError> {
        loop {
            match commits.try_recv() {
                Ok(stx) => {
                    self.journal.append(&stx)?;
                }
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    return Err(CommandError::JournalLagged(missed));
                }
                Err(_) => return Ok(()),
            }
        }
    }
}

/// Result of re-verifying the journal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditReport {
    pub checked: usize,
    pub failures: Vec<AuditFailure>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFailure {
    pub sequence: u64,
    pub tx_id: String,
    pub reason: String,
}

/// Errors raised by node commands
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("Journal replay failed: {0}")]
    Replay(#[from] NotaryError),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("'{0}' is the notary and cannot act as a party")]
    ReservedName(String),

    #[error("Unknown party: {0}")]
    UnknownParty(String),

    #[error("Missed {0} commits while journaling")]
    JournalLagged(u64),
}
