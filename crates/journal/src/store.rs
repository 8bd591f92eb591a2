//! Append-only transaction journal

use crate::error::JournalError;
use crate::reader::JournalReader;
use crate::record::JournalRecord;
use chrono::Utc;
use iou_ledger::SignedTransaction;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// JSONL journal, one file per day
pub struct TransactionJournal {
    base_path: PathBuf,
    next_sequence: u64,
    current_file: Option<BufWriter<File>>,
    current_date: Option<String>,
}

impl TransactionJournal {
    /// Open (or create) a journal directory, continuing after its last record
    pub fn open(base_path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let last = JournalReader::from_directory(&base_path)?.last_sequence()?;

        Ok(Self {
            base_path,
            next_sequence: last.map_or(1, |seq| seq + 1),
            current_file: None,
            current_date: None,
        })
    }

    /// Append a committed transaction
    pub fn append(&mut self, stx: &SignedTransaction) -> Result<JournalRecord, JournalError> {
        let record = JournalRecord {
            sequence: self.next_sequence,
            recorded_at: Utc::now(),
            transaction: stx.clone(),
        };
        let date = record.recorded_at.format("%Y-%m-%d").to_string();

        if self.current_date.as_ref() != Some(&date) {
            self.rotate_file(&date)?;
        }

        if let Some(ref mut writer) = self.current_file {
            let json = serde_json::to_string(&record)?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }

        tracing::debug!(sequence = record.sequence, tx_id = %stx.id(), "Journaled transaction");
        self.next_sequence += 1;
        Ok(record)
    }

    fn rotate_file(&mut self, date: &str) -> Result<(), JournalError> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }

        let file_path = self.base_path.join(format!("{}.jsonl", date));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;

        self.current_file = Some(BufWriter::new(file));
        self.current_date = Some(date.to_string());

        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Sequence number the next record will get
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Flush and close the current file
    pub fn close(&mut self) -> Result<(), JournalError> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }
        self.current_file = None;
        self.current_date = None;
        Ok(())
    }
}

impl Drop for TransactionJournal {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iou_core::{Currency, Money};
    use iou_ledger::{Command, IouState, Party, PartySigner, Signer, TransactionBuilder};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn signed_issue() -> SignedTransaction {
        let alice = PartySigner::generate();
        let bob = PartySigner::generate();
        let notary = Party::new("NOTARY", PartySigner::generate().public_key());
        let iou = IouState::new(
            Money::new(dec!(25), Currency::Eur).unwrap(),
            Party::new("ALICE", alice.public_key()),
            Party::new("BOB", bob.public_key()),
        );
        let tx = TransactionBuilder::new(notary)
            .command(Command::issue(iou.participant_keys()))
            .output(iou)
            .build()
            .unwrap();
        SignedTransaction::new(tx.clone())
            .with_signature(alice.sign(&tx))
            .unwrap()
            .with_signature(bob.sign(&tx))
            .unwrap()
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = TempDir::new().unwrap();
        let first = signed_issue();
        let second = signed_issue();

        {
            let mut journal = TransactionJournal::open(dir.path()).unwrap();
            assert_eq!(journal.append(&first).unwrap().sequence, 1);
            assert_eq!(journal.append(&second).unwrap().sequence, 2);
        }

        let reader = JournalReader::from_directory(dir.path()).unwrap();
        assert_eq!(reader.count().unwrap(), 2);
        assert_eq!(reader.transactions().unwrap(), vec![first, second]);
    }

    #[test]
    fn test_reopen_continues_sequence() {
        let dir = TempDir::new().unwrap();
        {
            let mut journal = TransactionJournal::open(dir.path()).unwrap();
            journal.append(&signed_issue()).unwrap();
        }

        let mut journal = TransactionJournal::open(dir.path()).unwrap();
        assert_eq!(journal.next_sequence(), 2);
        assert_eq!(journal.append(&signed_issue()).unwrap().sequence, 2);
    }

    #[test]
    fn test_sequence_gap_detected() {
        let dir = TempDir::new().unwrap();
        let record = JournalRecord {
            sequence: 3,
            recorded_at: Utc::now(),
            transaction: signed_issue(),
        };
        let line = serde_json::to_string(&record).unwrap();
        std::fs::write(dir.path().join("2024-01-01.jsonl"), format!("{}\n", line)).unwrap();

        let reader = JournalReader::from_directory(dir.path()).unwrap();
        assert!(matches!(
            reader.read_all(),
            Err(JournalError::SequenceGap { expected: 1, found: 3 })
        ));
    }
}
