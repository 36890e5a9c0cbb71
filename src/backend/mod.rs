//! Backend Module
//!
//! The capability set the record store needs from a wide-column backend,
//! and a local implementation of it.
//!
//! ## Planes
//! - [`TableGateway`]: point reads, prefix/range scans, single-cell
//!   mutations and row deletes against one table at a time
//! - [`AdminGateway`]: table and column family management
//!
//! Each plane is a separate handle with its own `close`, mirroring a remote
//! service where data and admin clients hold separate connections.
//!
//! ## Atomicity
//! Every single-row read and every single-cell or single-row mutation is
//! atomic. Nothing spans rows.

mod local;
mod table;

pub use local::{LocalAdminClient, LocalBackend, LocalDataClient};

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;

use crate::error::BackendError;

/// Result type for gateway calls
pub type GatewayResult<T> = std::result::Result<T, BackendError>;

// =============================================================================
// Gateway Traits
// =============================================================================

/// Data plane of the backend
pub trait TableGateway: Send + Sync {
    /// Point lookup. `Ok(None)` when the row has no cells passing `filter`.
    fn read_row(&self, table: &str, key: &str, filter: &ColumnFilter) -> GatewayResult<Option<Row>>;

    /// Ordered scan over `range`, skipping rows with no cells passing
    /// `filter`. Stops as soon as `on_row` returns `false`.
    fn scan_rows(
        &self,
        table: &str,
        range: &RowRange,
        filter: &ColumnFilter,
        on_row: &mut dyn FnMut(Row) -> bool,
    ) -> GatewayResult<()>;

    /// Single-cell upsert
    fn mutate_cell(&self, table: &str, key: &str, cell: SetCell) -> GatewayResult<()>;

    /// Remove every cell of a row. Deleting an absent row succeeds.
    fn delete_row(&self, table: &str, key: &str) -> GatewayResult<()>;

    /// Release the connection; later calls fail with [`BackendError::Closed`]
    fn close(&self) -> GatewayResult<()>;
}

/// Administrative plane of the backend
pub trait AdminGateway: Send + Sync {
    fn list_tables(&self) -> GatewayResult<Vec<String>>;

    /// Fails with [`BackendError::TableExists`] if the table exists
    fn create_table(&self, name: &str) -> GatewayResult<()>;

    fn table_info(&self, name: &str) -> GatewayResult<TableInfo>;

    /// Fails with [`BackendError::FamilyExists`] if the family exists
    fn create_column_family(&self, table: &str, family: &str) -> GatewayResult<()>;

    /// Drop a table and every row in it
    fn delete_table(&self, name: &str) -> GatewayResult<()>;

    fn close(&self) -> GatewayResult<()>;
}

// =============================================================================
// Shared Types
// =============================================================================

/// Cell write time in microseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Wall-clock now, truncated to millisecond granularity
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        Self(micros - micros % 1000)
    }

    pub fn as_micros(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One cell as returned by a read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub qualifier: String,
    pub value: Bytes,
    pub timestamp: Timestamp,
}

/// A row as returned by a read: family -> cells, both in sorted order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    key: String,
    families: BTreeMap<String, Vec<Cell>>,
}

impl Row {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            families: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, family: &str, cell: Cell) {
        self.families.entry(family.to_string()).or_default().push(cell);
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Cells of `family`, if the row has any
    pub fn family(&self, family: &str) -> Option<&[Cell]> {
        self.families.get(family).map(Vec::as_slice)
    }

    /// First cell of `family`
    pub fn first_cell(&self, family: &str) -> Option<&Cell> {
        self.family(family).and_then(|cells| cells.first())
    }

    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.families.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.families.values().all(Vec::is_empty)
    }
}

/// Which columns a read returns
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnFilter {
    #[default]
    All,

    /// Only cells whose qualifier equals this name, in any family
    Qualifier(String),
}

impl ColumnFilter {
    pub fn qualifier(name: impl Into<String>) -> Self {
        ColumnFilter::Qualifier(name.into())
    }

    pub fn matches(&self, qualifier: &str) -> bool {
        match self {
            ColumnFilter::All => true,
            ColumnFilter::Qualifier(name) => name == qualifier,
        }
    }
}

/// Which rows a scan visits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRange {
    /// Every row whose key starts with the prefix
    Prefix(String),

    /// `start <= key < end`; an absent end is unbounded
    Range { start: String, end: Option<String> },
}

impl RowRange {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        RowRange::Prefix(prefix.into())
    }

    pub fn contains(&self, key: &str) -> bool {
        match self {
            RowRange::Prefix(prefix) => key.starts_with(prefix.as_str()),
            RowRange::Range { start, end } => {
                key >= start.as_str() && end.as_deref().map_or(true, |end| key < end)
            }
        }
    }

    /// Smallest key the range can contain
    pub fn start(&self) -> &str {
        match self {
            RowRange::Prefix(prefix) => prefix,
            RowRange::Range { start, .. } => start,
        }
    }
}

/// A single-cell upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCell {
    pub family: String,
    pub qualifier: String,
    pub value: Bytes,
    pub timestamp: Timestamp,
}

impl SetCell {
    pub fn new(
        family: impl Into<String>,
        qualifier: impl Into<String>,
        value: impl Into<Bytes>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
            value: value.into(),
            timestamp,
        }
    }
}

/// Schema of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub families: Vec<String>,
}
