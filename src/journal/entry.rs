//! Journal entry definitions

use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest payload a single entry may carry (64 MB)
pub const MAX_ENTRY_SIZE: u32 = 64 * 1024 * 1024;

/// A single entry in the journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The mutation that was accepted
    pub operation: Operation,

    /// Unix millis when the entry was appended
    pub logged_at: u64,
}

/// Mutations that can be journaled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    CreateTable {
        table: String,
    },

    DeleteTable {
        table: String,
    },

    CreateFamily {
        table: String,
        family: String,
    },

    /// Single-cell upsert
    SetCell {
        table: String,
        key: String,
        family: String,
        qualifier: String,
        value: Vec<u8>,
        timestamp: u64,
    },

    DeleteRow {
        table: String,
        key: String,
    },
}

impl JournalEntry {
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let logged_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operation,
            logged_at,
        }
    }

    /// Encode the entry as one framed record (header + data)
    pub fn serialize(&self) -> Result<Vec<u8>, BackendError> {
        let data = bincode::serialize(self)
            .map_err(|e| BackendError::Serialization(e.to_string()))?;

        if data.len() > MAX_ENTRY_SIZE as usize {
            return Err(BackendError::Serialization(format!(
                "journal entry too large: {} bytes (max {})",
                data.len(),
                MAX_ENTRY_SIZE
            )));
        }

        let mut framed = Vec::with_capacity(HEADER_SIZE + data.len());
        framed.extend_from_slice(&self.lsn.to_be_bytes());
        framed.extend_from_slice(&crc32fast::hash(&data).to_be_bytes());
        framed.extend_from_slice(&(data.len() as u32).to_be_bytes());
        framed.extend_from_slice(&data);

        Ok(framed)
    }

    /// Decode the data section of a framed record, verifying its checksum
    pub fn deserialize(lsn: u64, crc: u32, data: &[u8]) -> Result<Self, BackendError> {
        let actual = crc32fast::hash(data);
        if actual != crc {
            return Err(BackendError::JournalCorruption(format!(
                "checksum mismatch at lsn {}: stored {:08x}, computed {:08x}",
                lsn, crc, actual
            )));
        }

        let entry: JournalEntry = bincode::deserialize(data)
            .map_err(|e| BackendError::JournalCorruption(format!("lsn {}: {}", lsn, e)))?;

        if entry.lsn != lsn {
            return Err(BackendError::JournalCorruption(format!(
                "header lsn {} does not match entry lsn {}",
                lsn, entry.lsn
            )));
        }

        Ok(entry)
    }
}
