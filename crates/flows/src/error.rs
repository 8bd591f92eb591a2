//! Flow errors
//!
//! Each collaborator has its own error type; all of them fold into
//! [`FlowError`], the terminal result of a single flow run.

use iou_ledger::{ContractError, LedgerError, LinearId, Party, PartyKey, Rule, StateRef, TxId};
use thiserror::Error;

/// Vault lookup failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("No current state for {0}")]
    NotFound(LinearId),

    #[error("{count} current states found for {linear_id}, expected exactly one")]
    Ambiguous { linear_id: LinearId, count: usize },
}

/// Session transport failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Party {0} is unreachable")]
    Unreachable(String),

    #[error("Session with {0} disconnected")]
    Disconnected(String),

    #[error("No reply from {party} within {after_ms}ms")]
    Timeout { party: String, after_ms: u64 },

    #[error("Unexpected message from {party}: {detail}")]
    Protocol { party: String, detail: String },
}

/// Signing service failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SigningError {
    #[error("No signing key held for {0}")]
    UnknownKey(PartyKey),
}

/// Notary (commit) failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotaryError {
    #[error("Input states already consumed: {}", format_refs(.consumed))]
    Conflict { consumed: Vec<StateRef> },

    #[error("Transaction rejected by notary: {0}")]
    Rejected(String),
}

/// Terminal failure of a flow run
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Validation rejected: {0}")]
    ValidationRejected(Rule),

    #[error("IOU {0} not found")]
    NotFound(LinearId),

    #[error("IOU {linear_id} is ambiguous ({count} current versions)")]
    Ambiguous { linear_id: LinearId, count: usize },

    #[error("IOU transfer can only be initiated by the IOU lender ({lender}), not {caller}")]
    Unauthorized { caller: String, lender: String },

    #[error("{party} refused to sign: {reason}")]
    SignatureRefused { party: String, reason: String },

    #[error("Session with {party} failed: {reason}")]
    SessionFailure { party: String, reason: String },

    #[error("Commit conflict on transaction {tx_id}: {source}")]
    CommitConflict {
        tx_id: TxId,
        #[source]
        source: NotaryError,
    },

    #[error("Commit of transaction {tx_id} rejected: {reason}")]
    CommitRejected { tx_id: TxId, reason: String },

    #[error("Signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl FlowError {
    pub fn session(party: &Party, err: SessionError) -> Self {
        FlowError::SessionFailure {
            party: party.name.clone(),
            reason: err.to_string(),
        }
    }

    /// The violated contract rule, if this is a validation failure
    pub fn rule(&self) -> Option<Rule> {
        match self {
            FlowError::ValidationRejected(rule) => Some(*rule),
            _ => None,
        }
    }

    /// Losing a race for the same input; re-query and re-initiate
    pub fn is_conflict(&self) -> bool {
        matches!(self, FlowError::CommitConflict { .. })
    }
}

impl From<ContractError> for FlowError {
    fn from(err: ContractError) -> Self {
        FlowError::ValidationRejected(err.rule())
    }
}

impl From<LookupError> for FlowError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotFound(linear_id) => FlowError::NotFound(linear_id),
            LookupError::Ambiguous { linear_id, count } => {
                FlowError::Ambiguous { linear_id, count }
            }
        }
    }
}

fn format_refs(refs: &[StateRef]) -> String {
    refs.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_error_keeps_rule() {
        let err: FlowError = ContractError::Rejected(Rule::TransferSigners).into();
        assert_eq!(err.rule(), Some(Rule::TransferSigners));
        assert!(err.to_string().contains("transfer_signers"));
    }

    #[test]
    fn test_lookup_errors_map() {
        let id = LinearId::new();
        let err: FlowError = LookupError::NotFound(id).into();
        assert!(matches!(err, FlowError::NotFound(found) if found == id));

        let err: FlowError = LookupError::Ambiguous { linear_id: id, count: 2 }.into();
        assert!(matches!(err, FlowError::Ambiguous { count: 2, .. }));
    }

    #[test]
    fn test_timeout_message() {
        let err = SessionError::Timeout {
            party: "BOB".to_string(),
            after_ms: 500,
        };
        assert!(err.to_string().contains("500ms"));
    }
}
