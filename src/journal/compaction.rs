//! Journal Compaction
//!
//! Replaces a journal with the minimal sequence of operations that rebuilds
//! the current state. Run on open, before any new entry is appended.

use std::fs;
use std::path::Path;

use crate::config::JournalSyncStrategy;
use crate::error::BackendError;

use super::{JournalWriter, Operation};

/// Rewrites a journal from a snapshot of live state
pub struct JournalCompaction;

impl JournalCompaction {
    /// Replace the journal at `path` with `operations`, LSNs restarting at 1
    ///
    /// The new journal is written and fsynced next to the old one, then
    /// renamed over it, so a crash at any point leaves one complete journal.
    /// Returns a writer positioned after the last rewritten entry.
    pub fn rewrite(
        path: &Path,
        operations: Vec<Operation>,
        sync_strategy: JournalSyncStrategy,
    ) -> Result<JournalWriter, BackendError> {
        let staging = path.with_extension("compact");
        if staging.exists() {
            fs::remove_file(&staging)?;
        }

        let count = operations.len() as u64;
        {
            let bulk = JournalSyncStrategy::EveryNEntries { count: usize::MAX };
            let mut writer = JournalWriter::open(&staging, bulk, 1)?;
            for op in operations {
                writer.append(op)?;
            }
            writer.sync()?;
        }

        fs::rename(&staging, path)?;

        tracing::info!(path = %path.display(), entries = count, "journal compacted");

        JournalWriter::open(path, sync_strategy, count + 1)
    }
}
