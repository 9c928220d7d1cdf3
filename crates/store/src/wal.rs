// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only write-ahead log of commit records

use crate::baseline::CommitRecord;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("wal io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("wal serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// One durable entry: sequence number plus the committed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub record: CommitRecord,
}

/// JSON-lines write-ahead log.
///
/// A crash can leave a truncated final line; `replay` stops there and
/// `open` positions new writes after the last complete entry, so a torn
/// tail is overwritten rather than compounded.
pub struct Wal {
    path: PathBuf,
    writer: BufWriter<File>,
    write_seq: u64,
}

impl Wal {
    /// Open (creating if absent). `write_seq` resumes after the last
    /// complete entry on disk, but never below `min_seq` (the sequence the
    /// current snapshot subsumes) so fresh appends always sort after it.
    pub fn open(path: &Path, min_seq: u64) -> Result<Self, WalError> {
        let entries = Self::replay(path)?;
        let write_seq = entries.last().map(|e| e.seq).unwrap_or(0).max(min_seq);
        let valid_len = Self::valid_prefix_len(path)?;
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        file.set_len(valid_len)?;
        file.seek(SeekFrom::End(0))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            write_seq,
        })
    }

    /// Read every complete entry, ignoring a torn tail.
    pub fn replay(path: &Path) -> Result<Vec<WalEntry>, WalError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<WalEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        after_seq = entries.last().map(|e: &WalEntry| e.seq).unwrap_or(0),
                        error = %e,
                        "discarding torn wal tail"
                    );
                    break;
                }
            }
        }
        Ok(entries)
    }

    /// Append a record. Durable only after [`Wal::flush`].
    pub fn append(&mut self, record: &CommitRecord) -> Result<u64, WalError> {
        self.write_seq += 1;
        let entry = WalEntry {
            seq: self.write_seq,
            record: record.clone(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        Ok(entry.seq)
    }

    /// Flush buffered entries and fsync.
    pub fn flush(&mut self) -> Result<(), WalError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Drop all entries (after a checkpoint subsumed them).
    pub fn truncate(&mut self) -> Result<(), WalError> {
        self.writer.flush()?;
        let file = self.writer.get_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.sync_all()?;
        Ok(())
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte length of the longest prefix that parses as complete lines.
    fn valid_prefix_len(path: &Path) -> Result<u64, WalError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut reader = BufReader::new(file);
        let mut valid = 0u64;
        let mut line = String::new();
        loop {
            line.clear();
            let n = reader.read_line(&mut line)?;
            if n == 0 {
                break;
            }
            if !line.ends_with('\n') || serde_json::from_str::<WalEntry>(&line).is_err() {
                break;
            }
            valid += n as u64;
        }
        Ok(valid)
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
