//! Sequential journal reader for replay

use crate::error::JournalError;
use crate::record::JournalRecord;
use iou_ledger::SignedTransaction;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

pub struct JournalReader {
    files: Vec<PathBuf>,
}

impl JournalReader {
    /// Reader over every `.jsonl` file in a directory, oldest first.
    /// A missing directory reads as an empty journal.
    pub fn from_directory(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref();
        let mut files = Vec::new();

        if path.exists() {
            for entry in std::fs::read_dir(path)? {
                let entry = entry?;
                let file_path = entry.path();
                if file_path.extension().map_or(false, |ext| ext == "jsonl") {
                    files.push(file_path);
                }
            }
        }

        files.sort();

        Ok(Self { files })
    }

    fn records_in(file_path: &Path) -> Result<Vec<JournalRecord>, JournalError> {
        let reader = BufReader::new(File::open(file_path)?);
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }

    /// All records in order; sequence numbers must run 1, 2, 3, ...
    pub fn read_all(&self) -> Result<Vec<JournalRecord>, JournalError> {
        let mut records = Vec::new();

        for file_path in &self.files {
            for record in Self::records_in(file_path)? {
                let expected = records.len() as u64 + 1;
                if record.sequence != expected {
                    return Err(JournalError::SequenceGap {
                        expected,
                        found: record.sequence,
                    });
                }
                records.push(record);
            }
        }

        tracing::debug!(files = self.files.len(), records = records.len(), "Read journal");
        Ok(records)
    }

    /// Committed transactions in journal order
    pub fn transactions(&self) -> Result<Vec<SignedTransaction>, JournalError> {
        Ok(self
            .read_all()?
            .into_iter()
            .map(|record| record.transaction)
            .collect())
    }

    /// Sequence number of the newest record
    pub fn last_sequence(&self) -> Result<Option<u64>, JournalError> {
        match self.files.last() {
            Some(last_file) => Ok(Self::records_in(last_file)?
                .last()
                .map(|record| record.sequence)),
            None => Ok(None),
        }
    }

    /// Count records across all files
    pub fn count(&self) -> Result<usize, JournalError> {
        let mut count = 0;

        for file_path in &self.files {
            let reader = BufReader::new(File::open(file_path)?);
            for line in reader.lines() {
                if !line?.trim().is_empty() {
                    count += 1;
                }
            }
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let reader = JournalReader::from_directory(dir.path().join("nope")).unwrap();
        assert!(reader.read_all().unwrap().is_empty());
        assert_eq!(reader.last_sequence().unwrap(), None);
    }

    #[test]
    fn test_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a journal").unwrap();
        std::fs::write(dir.path().join("2024-01-01.jsonl"), "\n\n").unwrap();

        let reader = JournalReader::from_directory(dir.path()).unwrap();
        assert_eq!(reader.count().unwrap(), 0);
    }
}
