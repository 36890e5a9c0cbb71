//! Local Backend
//!
//! An in-process wide-column backend with optional journal durability.
//!
//! ## Concurrency Model
//! - Tables live behind one `RwLock`: reads and scans share it, mutations
//!   take it exclusively, so every single-row operation is atomic
//! - The journal is appended while the write lock is held, so journal order
//!   always equals apply order
//! - A mutation whose journal append fails is not applied, and the journal
//!   refuses every later mutation until the backend is reopened
//! - Scans copy matching rows under the read lock and invoke the callback
//!   after releasing it; a callback may call back into the backend

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::{Config, JournalSyncStrategy};
use crate::error::BackendError;
use crate::journal::{
    JournalCompaction, JournalRecovery, JournalWriter, Operation, RecoveryResult,
};

use super::table::TableSet;
use super::{
    AdminGateway, ColumnFilter, GatewayResult, Row, RowRange, SetCell, TableGateway, TableInfo,
};

struct Shared {
    tables: RwLock<TableSet>,

    /// `None` for a purely in-memory backend
    journal: Option<Mutex<JournalWriter>>,
}

impl Shared {
    /// Validate, journal, then apply a mutation
    fn mutate(&self, op: Operation) -> GatewayResult<()> {
        let mut tables = self.tables.write();
        tables.validate(&op)?;

        if let Some(journal) = &self.journal {
            journal.lock().append(op.clone())?;
        }

        tables.apply(op);
        Ok(())
    }
}

/// Handle to one local backend instance
///
/// Cheap to clone; every clone and every client sees the same tables.
#[derive(Clone)]
pub struct LocalBackend {
    shared: Arc<Shared>,
}

impl LocalBackend {
    /// A backend that keeps everything in memory
    pub fn in_memory() -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: RwLock::new(TableSet::new()),
                journal: None,
            }),
        }
    }

    /// Open or create a journaled backend at `path`
    ///
    /// On open:
    /// 1. Recover valid entries from the journal (truncating a torn tail)
    /// 2. Replay them into memory
    /// 3. Rewrite the journal from live state if a table was dropped or
    ///    fewer than half the entries still matter
    /// 4. Reopen the journal for appending
    pub fn open(path: &Path, sync: JournalSyncStrategy) -> GatewayResult<(Self, RecoveryResult)> {
        let (entries, recovery) = JournalRecovery::recover(path)?;

        let mut tables = TableSet::new();
        let mut dropped_table = false;
        for entry in entries {
            dropped_table |= matches!(entry.operation, Operation::DeleteTable { .. });
            tables.apply(entry.operation);
        }

        if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
            tracing::info!(
                path = %path.display(),
                recovered = recovery.entries_recovered,
                corrupted = recovery.entries_corrupted,
                last_lsn = recovery.last_lsn,
                "journal replayed"
            );
        }

        let live = tables.snapshot();
        let writer = if dropped_table || (live.len() as u64) * 2 < recovery.entries_recovered {
            JournalCompaction::rewrite(path, live, sync)?
        } else {
            JournalWriter::open(path, sync, recovery.last_lsn + 1)?
        };

        let backend = Self {
            shared: Arc::new(Shared {
                tables: RwLock::new(tables),
                journal: Some(Mutex::new(writer)),
            }),
        };

        Ok((backend, recovery))
    }

    /// Build the backend described by `config`
    pub fn from_config(config: &Config) -> GatewayResult<Self> {
        match config.journal_path() {
            Some(path) => Self::open(&path, config.journal_sync_strategy).map(|(b, _)| b),
            None => Ok(Self::in_memory()),
        }
    }

    /// New data-plane client
    pub fn data_client(&self) -> LocalDataClient {
        LocalDataClient {
            shared: Arc::clone(&self.shared),
            closed: AtomicBool::new(false),
        }
    }

    /// New admin-plane client
    pub fn admin_client(&self) -> LocalAdminClient {
        LocalAdminClient {
            shared: Arc::clone(&self.shared),
            closed: AtomicBool::new(false),
        }
    }
}

// =============================================================================
// Data Client
// =============================================================================

/// Data-plane connection to a [`LocalBackend`]
pub struct LocalDataClient {
    shared: Arc<Shared>,
    closed: AtomicBool,
}

impl LocalDataClient {
    fn ensure_open(&self) -> GatewayResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BackendError::Closed);
        }
        Ok(())
    }
}

impl TableGateway for LocalDataClient {
    fn read_row(&self, table: &str, key: &str, filter: &ColumnFilter) -> GatewayResult<Option<Row>> {
        self.ensure_open()?;
        self.shared.tables.read().read_row(table, key, filter)
    }

    fn scan_rows(
        &self,
        table: &str,
        range: &RowRange,
        filter: &ColumnFilter,
        on_row: &mut dyn FnMut(Row) -> bool,
    ) -> GatewayResult<()> {
        self.ensure_open()?;
        let rows = self.shared.tables.read().scan(table, range, filter)?;

        for row in rows {
            if !on_row(row) {
                break;
            }
        }
        Ok(())
    }

    fn mutate_cell(&self, table: &str, key: &str, cell: SetCell) -> GatewayResult<()> {
        self.ensure_open()?;
        self.shared.mutate(Operation::SetCell {
            table: table.to_string(),
            key: key.to_string(),
            family: cell.family,
            qualifier: cell.qualifier,
            value: cell.value.to_vec(),
            timestamp: cell.timestamp.as_micros(),
        })
    }

    fn delete_row(&self, table: &str, key: &str) -> GatewayResult<()> {
        self.ensure_open()?;
        self.shared.mutate(Operation::DeleteRow {
            table: table.to_string(),
            key: key.to_string(),
        })
    }

    fn close(&self) -> GatewayResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(BackendError::Closed);
        }
        tracing::debug!("data client closed");
        Ok(())
    }
}

// =============================================================================
// Admin Client
// =============================================================================

/// Admin-plane connection to a [`LocalBackend`]
pub struct LocalAdminClient {
    shared: Arc<Shared>,
    closed: AtomicBool,
}

impl LocalAdminClient {
    fn ensure_open(&self) -> GatewayResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BackendError::Closed);
        }
        Ok(())
    }
}

impl AdminGateway for LocalAdminClient {
    fn list_tables(&self) -> GatewayResult<Vec<String>> {
        self.ensure_open()?;
        Ok(self.shared.tables.read().table_names())
    }

    fn create_table(&self, name: &str) -> GatewayResult<()> {
        self.ensure_open()?;
        self.shared.mutate(Operation::CreateTable {
            table: name.to_string(),
        })
    }

    fn table_info(&self, name: &str) -> GatewayResult<TableInfo> {
        self.ensure_open()?;
        self.shared.tables.read().table_info(name)
    }

    fn create_column_family(&self, table: &str, family: &str) -> GatewayResult<()> {
        self.ensure_open()?;
        self.shared.mutate(Operation::CreateFamily {
            table: table.to_string(),
            family: family.to_string(),
        })
    }

    fn delete_table(&self, name: &str) -> GatewayResult<()> {
        self.ensure_open()?;
        self.shared.mutate(Operation::DeleteTable {
            table: name.to_string(),
        })
    }

    fn close(&self) -> GatewayResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(BackendError::Closed);
        }
        tracing::debug!("admin client closed");
        Ok(())
    }
}
