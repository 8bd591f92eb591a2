//! One journal line

use chrono::{DateTime, Utc};
use iou_ledger::SignedTransaction;
use serde::{Deserialize, Serialize};

/// A committed transaction and its position in the journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Starts at 1, no gaps
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub transaction: SignedTransaction,
}
