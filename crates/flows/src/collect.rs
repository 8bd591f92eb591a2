//! Counter-signature collection and finalization
//!
//! Shared by the issue and transfer flows. Collection fans out one request
//! per counterparty and joins on the full quorum; the first failure aborts
//! the whole collection and nothing gathered so far is committed.

use futures::future::try_join_all;
use iou_ledger::{Party, PartyKey, SignedTransaction, TransactionSignature, WireTransaction};
use std::collections::BTreeMap;

use crate::error::{FlowError, NotaryError, SessionError};
use crate::services::{FlowMessage, ServiceHub};

/// Participants of the transaction's inputs and outputs, other than us
pub fn counterparties(tx: &WireTransaction, us: &Party) -> Vec<Party> {
    let mut by_key: BTreeMap<PartyKey, Party> = BTreeMap::new();
    let states = tx
        .inputs
        .iter()
        .map(|input| &input.state)
        .chain(tx.iou_outputs());

    for state in states {
        for party in state.participants() {
            by_key
                .entry(party.owning_key())
                .or_insert_with(|| party.clone());
        }
    }

    by_key.remove(&us.owning_key());
    by_key.into_values().collect()
}

/// Ask every counterparty to countersign and attach their signatures.
///
/// Succeeds only once all of them have answered with a valid signature.
pub async fn collect_signatures(
    hub: &ServiceHub,
    mut stx: SignedTransaction,
    counterparties: &[Party],
) -> Result<SignedTransaction, FlowError> {
    tracing::debug!(
        tx_id = %stx.id(),
        counterparties = counterparties.len(),
        "Collecting signatures"
    );

    let requests = counterparties
        .iter()
        .map(|party| request_signature(hub, &stx, party));
    let signatures = try_join_all(requests).await?;

    for signature in signatures {
        stx.add_signature(signature)?;
    }
    Ok(stx)
}

async fn request_signature(
    hub: &ServiceHub,
    stx: &SignedTransaction,
    party: &Party,
) -> Result<TransactionSignature, FlowError> {
    let timeout = hub.config.signature_timeout();

    let signature = match tokio::time::timeout(timeout, exchange(hub, stx, party)).await {
        Ok(result) => result?,
        Err(_) => {
            tracing::warn!(
                party = %party,
                timeout_ms = hub.config.signature_timeout_ms,
                "Signature request timed out"
            );
            return Err(FlowError::session(
                party,
                SessionError::Timeout {
                    party: party.name.clone(),
                    after_ms: hub.config.signature_timeout_ms,
                },
            ));
        }
    };

    if signature.by != party.owning_key() {
        return Err(FlowError::session(
            party,
            SessionError::Protocol {
                party: party.name.clone(),
                detail: format!("signature is by key {}", signature.by),
            },
        ));
    }

    tracing::debug!(party = %party, tx_id = %stx.id(), "Received signature");
    Ok(signature)
}

/// One proposal/reply round trip. The session is closed when this returns
/// or is dropped.
async fn exchange(
    hub: &ServiceHub,
    stx: &SignedTransaction,
    party: &Party,
) -> Result<TransactionSignature, FlowError> {
    let mut session = hub
        .transport
        .open_session(party)
        .await
        .map_err(|e| FlowError::session(party, e))?;

    session
        .send(FlowMessage::Proposal(stx.clone()))
        .await
        .map_err(|e| FlowError::session(party, e))?;

    match session.receive().await {
        Ok(FlowMessage::Signature(signature)) => Ok(signature),
        Ok(FlowMessage::Refused(reason)) => Err(FlowError::SignatureRefused {
            party: party.name.clone(),
            reason,
        }),
        Ok(FlowMessage::Proposal(_)) => Err(FlowError::session(
            party,
            SessionError::Protocol {
                party: party.name.clone(),
                detail: "expected a signature, got a proposal".to_string(),
            },
        )),
        Err(e) => Err(FlowError::session(party, e)),
    }
}

/// Submit a fully-signed transaction to the notary. One attempt only.
pub async fn finalize(
    hub: &ServiceHub,
    stx: SignedTransaction,
) -> Result<SignedTransaction, FlowError> {
    stx.verify_required_signatures()?;

    match hub.notary.commit(&stx).await {
        Ok(receipt) => {
            tracing::info!(
                tx_id = %receipt.tx_id,
                notary = %receipt.notary,
                "Transaction committed"
            );
            Ok(stx)
        }
        Err(source @ NotaryError::Conflict { .. }) => {
            tracing::warn!(tx_id = %stx.id(), error = %source, "Lost commit race");
            Err(FlowError::CommitConflict {
                tx_id: stx.id().clone(),
                source,
            })
        }
        Err(NotaryError::Rejected(reason)) => {
            tracing::warn!(tx_id = %stx.id(), reason = %reason, "Commit rejected");
            Err(FlowError::CommitRejected {
                tx_id: stx.id().clone(),
                reason,
            })
        }
    }
}
