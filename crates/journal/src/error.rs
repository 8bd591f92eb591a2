//! Journal errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Journal sequence gap: expected {expected}, found {found}")]
    SequenceGap { expected: u64, found: u64 },
}
