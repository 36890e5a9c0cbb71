//! Sorted in-memory tables
//!
//! BTreeMap-based storage for every table of the local backend. Row keys,
//! families and qualifiers are all kept in sorted order so scans come out in
//! key order. Only the newest cell per (family, qualifier) is retained.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use bytes::Bytes;

use crate::error::BackendError;
use crate::journal::Operation;

use super::{Cell, ColumnFilter, GatewayResult, Row, RowRange, TableInfo, Timestamp};

#[derive(Debug, Clone)]
struct StoredCell {
    value: Bytes,
    timestamp: Timestamp,
}

/// family -> qualifier -> newest cell
type StoredRow = BTreeMap<String, BTreeMap<String, StoredCell>>;

#[derive(Debug, Default)]
struct Table {
    families: BTreeSet<String>,
    rows: BTreeMap<String, StoredRow>,
}

/// All tables of one backend instance
#[derive(Debug, Default)]
pub(super) struct TableSet {
    tables: BTreeMap<String, Table>,
}

impl TableSet {
    pub(super) fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Check that `op` can be applied to the current state
    pub(super) fn validate(&self, op: &Operation) -> GatewayResult<()> {
        match op {
            Operation::CreateTable { table } => {
                if self.tables.contains_key(table) {
                    return Err(BackendError::TableExists(table.clone()));
                }
            }
            Operation::DeleteTable { table } | Operation::DeleteRow { table, .. } => {
                self.table(table)?;
            }
            Operation::CreateFamily { table, family } => {
                if self.table(table)?.families.contains(family) {
                    return Err(BackendError::FamilyExists {
                        table: table.clone(),
                        family: family.clone(),
                    });
                }
            }
            Operation::SetCell { table, family, .. } => {
                if !self.table(table)?.families.contains(family) {
                    return Err(BackendError::FamilyNotFound {
                        table: table.clone(),
                        family: family.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Apply a validated operation
    ///
    /// Operations that no longer match the state (replayed against a
    /// table that is gone) are ignored.
    pub(super) fn apply(&mut self, op: Operation) {
        match op {
            Operation::CreateTable { table } => {
                self.tables.entry(table).or_default();
            }
            Operation::DeleteTable { table } => {
                self.tables.remove(&table);
            }
            Operation::CreateFamily { table, family } => {
                if let Some(t) = self.tables.get_mut(&table) {
                    t.families.insert(family);
                }
            }
            Operation::SetCell {
                table,
                key,
                family,
                qualifier,
                value,
                timestamp,
            } => {
                let Some(t) = self.tables.get_mut(&table) else {
                    return;
                };

                let incoming = StoredCell {
                    value: Bytes::from(value),
                    timestamp: Timestamp::from_micros(timestamp),
                };

                let cells = t.rows.entry(key).or_default().entry(family).or_default();
                // An older write never replaces a newer cell
                let stale = cells
                    .get(&qualifier)
                    .map_or(false, |existing| existing.timestamp > incoming.timestamp);
                if !stale {
                    cells.insert(qualifier, incoming);
                }
            }
            Operation::DeleteRow { table, key } => {
                if let Some(t) = self.tables.get_mut(&table) {
                    t.rows.remove(&key);
                }
            }
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub(super) fn read_row(
        &self,
        table: &str,
        key: &str,
        filter: &ColumnFilter,
    ) -> GatewayResult<Option<Row>> {
        let t = self.table(table)?;
        Ok(t.rows.get(key).and_then(|stored| filtered(key, stored, filter)))
    }

    /// Snapshot of every row in `range` with at least one cell passing `filter`
    pub(super) fn scan(
        &self,
        table: &str,
        range: &RowRange,
        filter: &ColumnFilter,
    ) -> GatewayResult<Vec<Row>> {
        let t = self.table(table)?;

        let rows = t
            .rows
            .range::<str, _>((Bound::Included(range.start()), Bound::Unbounded))
            .take_while(|(key, _)| match range {
                RowRange::Prefix(prefix) => key.starts_with(prefix.as_str()),
                RowRange::Range { .. } => range.contains(key),
            })
            .filter_map(|(key, stored)| filtered(key, stored, filter))
            .collect();

        Ok(rows)
    }

    // =========================================================================
    // Schema
    // =========================================================================

    pub(super) fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub(super) fn table_info(&self, table: &str) -> GatewayResult<TableInfo> {
        let t = self.table(table)?;
        Ok(TableInfo {
            name: table.to_string(),
            families: t.families.iter().cloned().collect(),
        })
    }

    /// Operations that rebuild the current state from empty
    pub(super) fn snapshot(&self) -> Vec<Operation> {
        let mut ops = Vec::new();

        for (name, t) in &self.tables {
            ops.push(Operation::CreateTable {
                table: name.clone(),
            });
            for family in &t.families {
                ops.push(Operation::CreateFamily {
                    table: name.clone(),
                    family: family.clone(),
                });
            }
            for (key, stored) in &t.rows {
                for (family, cells) in stored {
                    for (qualifier, cell) in cells {
                        ops.push(Operation::SetCell {
                            table: name.clone(),
                            key: key.clone(),
                            family: family.clone(),
                            qualifier: qualifier.clone(),
                            value: cell.value.to_vec(),
                            timestamp: cell.timestamp.as_micros(),
                        });
                    }
                }
            }
        }

        ops
    }

    fn table(&self, table: &str) -> GatewayResult<&Table> {
        self.tables
            .get(table)
            .ok_or_else(|| BackendError::TableNotFound(table.to_string()))
    }
}

/// Project a stored row through a column filter; `None` if nothing passes
fn filtered(key: &str, stored: &StoredRow, filter: &ColumnFilter) -> Option<Row> {
    let mut row = Row::new(key);

    for (family, cells) in stored {
        for (qualifier, cell) in cells {
            if filter.matches(qualifier) {
                row.push(
                    family,
                    Cell {
                        qualifier: qualifier.clone(),
                        value: cell.value.clone(),
                        timestamp: cell.timestamp,
                    },
                );
            }
        }
    }

    if row.is_empty() {
        None
    } else {
        Some(row)
    }
}
