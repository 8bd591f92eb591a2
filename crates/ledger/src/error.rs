//! Ledger errors

use crate::party::PartyKey;
use crate::state::StateRef;
use thiserror::Error;

/// Errors that can occur building, signing or checking transactions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    #[error("Invalid signature from {signer}: {reason}")]
    InvalidSignature { signer: String, reason: String },

    #[error("Signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    #[error("Signature from {0} is not required by any command")]
    UnexpectedSigner(PartyKey),

    #[error("Transaction is missing signatures from: {}", format_keys(.0))]
    MissingSignatures(Vec<PartyKey>),

    #[error("Transaction id mismatch: expected {expected}, got {actual}")]
    TransactionIdMismatch { expected: String, actual: String },

    #[error("Input {0} is referenced more than once")]
    DuplicateInput(StateRef),

    #[error("Output {index} is not an IOU state")]
    NotAnIouOutput { index: usize },

    #[error("Output index {index} out of range ({count} outputs)")]
    OutputIndexOutOfRange { index: usize, count: usize },
}

fn format_keys(keys: &[PartyKey]) -> String {
    keys.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
