//! Journal Writer
//!
//! Appends framed entries to the journal file.
//!
//! Each frame goes to the file in a single `write_all` with nothing held
//! in user-space buffers. After any failed append the writer truncates the
//! file back to the last complete frame and refuses further appends, so an
//! entry whose append returned an error is never replayed.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::config::JournalSyncStrategy;
use crate::error::BackendError;

use super::{JournalEntry, Operation};

/// Writes entries to the journal file
pub struct JournalWriter {
    file: File,

    /// LSN the next appended entry receives
    next_lsn: u64,

    sync_strategy: JournalSyncStrategy,

    /// Entries written since the last fsync
    unsynced: usize,

    /// File length after the last complete frame
    committed_len: u64,

    /// Set after a failed append; holds the reason
    failed: Option<String>,
}

impl JournalWriter {
    /// Open or create a journal file for appending
    ///
    /// `next_lsn` must be one past the last LSN recovered from the file.
    pub fn open(
        path: &Path,
        sync_strategy: JournalSyncStrategy,
        next_lsn: u64,
    ) -> Result<Self, BackendError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let committed_len = file.metadata()?.len();

        Ok(Self {
            file,
            next_lsn,
            sync_strategy,
            unsynced: 0,
            committed_len,
            failed: None,
        })
    }

    /// Append an operation, returning the LSN it was assigned
    ///
    /// An entry that cannot be encoded is rejected without touching the
    /// file. Any I/O failure leaves the writer failed: see
    /// [`is_failed`](Self::is_failed).
    pub fn append(&mut self, operation: Operation) -> Result<u64, BackendError> {
        self.ensure_usable()?;

        let lsn = self.next_lsn;
        let bytes = JournalEntry::new(lsn, operation).serialize()?;

        if let Err(e) = self.write_frame(&bytes) {
            self.fail(&e);
            return Err(e);
        }

        self.committed_len += bytes.len() as u64;
        self.next_lsn += 1;
        Ok(lsn)
    }

    fn write_frame(&mut self, bytes: &[u8]) -> Result<(), BackendError> {
        self.file.write_all(bytes)?;
        self.unsynced += 1;

        let due = match self.sync_strategy {
            JournalSyncStrategy::EveryWrite => true,
            JournalSyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };

        if due {
            self.file.sync_data()?;
            self.unsynced = 0;
        }
        Ok(())
    }

    /// Drop whatever the failed append left behind and stop accepting writes
    fn fail(&mut self, cause: &BackendError) {
        tracing::error!(
            error = %cause,
            committed_len = self.committed_len,
            "journal append failed, refusing further writes"
        );

        if let Err(e) = self.file.set_len(self.committed_len) {
            tracing::error!(error = %e, "could not discard partial journal frame");
        }

        self.failed = Some(cause.to_string());
    }

    fn ensure_usable(&self) -> Result<(), BackendError> {
        match &self.failed {
            Some(reason) => Err(BackendError::Unavailable(format!(
                "journal failed earlier: {}",
                reason
            ))),
            None => Ok(()),
        }
    }

    /// fsync everything appended so far
    pub fn sync(&mut self) -> Result<(), BackendError> {
        self.ensure_usable()?;

        if let Err(e) = self.file.sync_data() {
            // Entries already appended were acknowledged; keep them on disk
            let e = BackendError::from(e);
            tracing::error!(error = %e, "journal sync failed, refusing further writes");
            self.failed = Some(e.to_string());
            return Err(e);
        }
        self.unsynced = 0;
        Ok(())
    }

    /// True once an append has failed; the journal must be reopened
    pub fn is_failed(&self) -> bool {
        self.failed.is_some()
    }

    /// LSN of the most recently appended entry (0 if none)
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn.saturating_sub(1)
    }
}
