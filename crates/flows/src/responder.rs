//! Counter-signing responder
//!
//! Runs once per incoming session. The proposal is validated from scratch:
//! the initiator's own checks are not trusted.

use iou_ledger::{
    ContractError, IouContract, LedgerError, SignedTransaction, TransactionSignature, TxId,
};
use std::sync::Arc;
use thiserror::Error;

use crate::config::FlowConfig;
use crate::error::{SessionError, SigningError};
use crate::services::{FlowMessage, FlowSession, IdentityService, ServiceHub, SigningService};

/// Why a proposal was not countersigned
#[derive(Debug, Error)]
pub enum Refusal {
    #[error("Expected a transaction proposal")]
    NotAProposal,

    #[error("Attached signature invalid: {0}")]
    BadSignature(#[from] LedgerError),

    #[error("{0}")]
    Contract(#[from] ContractError),

    #[error("This must be an IOU transaction")]
    NotAnIou,

    #[error("We are not a required signer of this transaction")]
    NotRequired,

    #[error("Signing failed: {0}")]
    Signing(#[from] SigningError),
}

/// How a responder session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderOutcome {
    Signed(TxId),
    Refused(String),
}

pub struct SignTransactionResponder {
    identity: Arc<dyn IdentityService>,
    signing: Arc<dyn SigningService>,
    config: FlowConfig,
}

impl SignTransactionResponder {
    pub fn new(
        identity: Arc<dyn IdentityService>,
        signing: Arc<dyn SigningService>,
        config: FlowConfig,
    ) -> Self {
        Self {
            identity,
            signing,
            config,
        }
    }

    pub fn from_hub(hub: &ServiceHub) -> Self {
        Self::new(hub.identity.clone(), hub.signing.clone(), hub.config.clone())
    }

    /// Handle one session: receive a proposal, reply with a signature or a
    /// refusal. Never finalizes.
    pub async fn respond(
        &self,
        session: &mut dyn FlowSession,
    ) -> Result<ResponderOutcome, SessionError> {
        let initiator = session.counterparty().clone();
        let message = session.receive().await?;

        let checked = match message {
            FlowMessage::Proposal(stx) => self
                .check_proposal(&stx)
                .map(|signature| (stx.id().clone(), signature)),
            _ => Err(Refusal::NotAProposal),
        };

        match checked {
            Ok((tx_id, signature)) => {
                tracing::debug!(initiator = %initiator, tx_id = %tx_id, "Countersigning proposal");
                session.send(FlowMessage::Signature(signature)).await?;
                Ok(ResponderOutcome::Signed(tx_id))
            }
            Err(refusal) => {
                let reason = refusal.to_string();
                tracing::info!(initiator = %initiator, reason = %reason, "Refusing to sign");
                session.send(FlowMessage::Refused(reason.clone())).await?;
                Ok(ResponderOutcome::Refused(reason))
            }
        }
    }

    /// Validate a proposal and produce our signature over it
    pub fn check_proposal(
        &self,
        stx: &SignedTransaction,
    ) -> Result<TransactionSignature, Refusal> {
        if self.config.verify_attached_signatures {
            stx.verify_signatures()?;
        } else {
            stx.tx.verify_id()?;
        }

        IouContract::verify(&stx.tx)?;

        let single_iou = stx.tx.outputs.len() == 1 && stx.tx.outputs[0].as_iou().is_some();
        if !single_iou {
            return Err(Refusal::NotAnIou);
        }

        let me = self.identity.our_identity();
        if !stx.tx.required_signers().contains(&me.owning_key()) {
            return Err(Refusal::NotRequired);
        }

        Ok(self.signing.sign(&stx.tx, &me)?)
    }
}
