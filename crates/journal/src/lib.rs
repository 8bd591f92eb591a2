//! IOU Journal - JSONL log of committed transactions
//!
//! Every transaction the notary accepts is appended as one JSON line.
//! Replaying the journal in order rebuilds the ledger.

pub mod error;
pub mod reader;
pub mod record;
pub mod store;

pub use error::JournalError;
pub use reader::JournalReader;
pub use record::JournalRecord;
pub use store::TransactionJournal;
