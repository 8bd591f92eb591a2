//! Transfer flow - initiator side
//!
//! ```text
//! Start
//!   │ vault lookup
//!   ▼
//! Queried ──► caller is not the lender? Unauthorized
//!   │ substitute lender, self-validate
//!   ▼
//! Built
//!   │ sign
//!   ▼
//! LocallySigned
//!   │ one session per counterparty, full quorum
//!   ▼
//! CollectingSignatures ──► refusal / timeout? abort
//!   │
//!   ▼
//! Finalizing ──► notary conflict? CommitConflict
//!   │
//!   ▼
//! Committed
//! ```
//!
//! Any step can end in `Failed`; nothing is committed in that case.

use iou_ledger::{
    Command, IouContract, LinearId, Party, SignedTransaction, TransactionBuilder,
};
use std::fmt;
use tokio::sync::watch;

use crate::collect::{collect_signatures, counterparties, finalize};
use crate::error::FlowError;
use crate::services::ServiceHub;

/// Progress of a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStep {
    Start,
    Queried,
    Built,
    LocallySigned,
    CollectingSignatures,
    Finalizing,
    Committed,
    Failed(String),
}

impl TransferStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStep::Committed | TransferStep::Failed(_))
    }
}

impl fmt::Display for TransferStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferStep::Start => write!(f, "start"),
            TransferStep::Queried => write!(f, "queried"),
            TransferStep::Built => write!(f, "built"),
            TransferStep::LocallySigned => write!(f, "locally_signed"),
            TransferStep::CollectingSignatures => write!(f, "collecting_signatures"),
            TransferStep::Finalizing => write!(f, "finalizing"),
            TransferStep::Committed => write!(f, "committed"),
            TransferStep::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Moves the lender position of an IOU to a new party
pub struct TransferFlow {
    hub: ServiceHub,
    progress: watch::Sender<TransferStep>,
}

impl TransferFlow {
    pub fn new(hub: ServiceHub) -> Self {
        let (progress, _) = watch::channel(TransferStep::Start);
        Self { hub, progress }
    }

    /// Follow the flow's progress
    pub fn progress(&self) -> watch::Receiver<TransferStep> {
        self.progress.subscribe()
    }

    pub fn step(&self) -> TransferStep {
        self.progress.borrow().clone()
    }

    /// Run the transfer. At most one commit attempt is made.
    pub async fn call(
        &self,
        linear_id: LinearId,
        new_lender: Party,
    ) -> Result<SignedTransaction, FlowError> {
        match self.run(linear_id, new_lender).await {
            Ok(stx) => {
                self.advance(TransferStep::Committed);
                Ok(stx)
            }
            Err(e) => {
                tracing::warn!(linear_id = %linear_id, error = %e, "Transfer failed");
                self.advance(TransferStep::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        linear_id: LinearId,
        new_lender: Party,
    ) -> Result<SignedTransaction, FlowError> {
        let me = self.hub.our_identity();

        let input = self.hub.vault.find_current(&linear_id).await?;
        self.advance(TransferStep::Queried);

        if input.state.lender.owning_key() != me.owning_key() {
            return Err(FlowError::Unauthorized {
                caller: me.name.clone(),
                lender: input.state.lender.name.clone(),
            });
        }

        let output = input.state.with_new_lender(new_lender);
        let signers = input
            .state
            .participant_keys()
            .union(&output.participant_keys())
            .copied()
            .collect::<Vec<_>>();

        let tx = TransactionBuilder::new(self.hub.identity.notary())
            .input(input)
            .output(output)
            .command(Command::transfer(signers))
            .build()?;
        IouContract::verify(&tx)?;
        self.advance(TransferStep::Built);

        let stx = SignedTransaction::new(tx.clone()).with_signature(self.hub.sign(&tx)?)?;
        self.advance(TransferStep::LocallySigned);

        self.advance(TransferStep::CollectingSignatures);
        let others = counterparties(&tx, &me);
        let stx = collect_signatures(&self.hub, stx, &others).await?;

        self.advance(TransferStep::Finalizing);
        finalize(&self.hub, stx).await
    }

    fn advance(&self, step: TransferStep) {
        tracing::debug!(flow = "transfer", step = %step, "Step");
        self.progress.send_replace(step);
    }
}
