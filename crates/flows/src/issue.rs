//! Issue flow - creates the first version of an IOU
//!
//! The caller becomes the lender; the borrower countersigns through the
//! same responder used for transfers.

use iou_core::Money;
use iou_ledger::{
    Command, IouContract, IouState, Party, SignedTransaction, TransactionBuilder,
};

use crate::collect::{collect_signatures, counterparties, finalize};
use crate::error::FlowError;
use crate::services::ServiceHub;

pub struct IssueFlow {
    hub: ServiceHub,
}

impl IssueFlow {
    pub fn new(hub: ServiceHub) -> Self {
        Self { hub }
    }

    pub async fn call(
        &self,
        amount: Money,
        borrower: Party,
    ) -> Result<SignedTransaction, FlowError> {
        let lender = self.hub.our_identity();
        let iou = IouState::new(amount, lender.clone(), borrower);
        let linear_id = iou.linear_id;

        match self.run(iou, &lender).await {
            Ok(stx) => {
                tracing::info!(linear_id = %linear_id, tx_id = %stx.id(), "IOU issued");
                Ok(stx)
            }
            Err(e) => {
                tracing::warn!(linear_id = %linear_id, error = %e, "Issue failed");
                Err(e)
            }
        }
    }

    async fn run(&self, iou: IouState, lender: &Party) -> Result<SignedTransaction, FlowError> {
        let tx = TransactionBuilder::new(self.hub.identity.notary())
            .command(Command::issue(iou.participant_keys()))
            .output(iou)
            .build()?;
        IouContract::verify(&tx)?;

        let stx = SignedTransaction::new(tx.clone()).with_signature(self.hub.sign(&tx)?)?;
        let others = counterparties(&tx, lender);
        let stx = collect_signatures(&self.hub, stx, &others).await?;

        finalize(&self.hub, stx).await
    }
}
