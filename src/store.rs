//! Record Store
//!
//! Typed record storage on top of a [`TableGateway`].
//!
//! ## Layout
//! - Active record: row `scope.prefix + id`, family `scope.family`,
//!   column = the record kind's qualifier, value = JSON payload
//! - Archived record: row `deleted#` + active row key, same family,
//!   column = the qualifier passed to [`RecordStore::delete`]
//!
//! ## Concurrency Model
//! The store holds no locks of its own. Every call is one or more
//! independent single-row backend operations, each atomic on its own, so a
//! single store behind an `Arc` serves any number of callers.
//!
//! [`RecordStore::delete`] is two operations (archive write, then row
//! delete). A failure between them leaves the active row in place next to
//! its archived copy: a duplicate, never a loss, and deleting again is safe.
//!
//! No retries, backoff or deadlines are applied; backend errors reach the
//! caller as [`RecordError::Transport`] on the first failure.

use std::collections::HashMap;
use std::ops::ControlFlow;

use bytes::Bytes;
use uuid::Uuid;

use crate::backend::{
    AdminGateway, ColumnFilter, LocalAdminClient, LocalBackend, LocalDataClient, Row, RowRange,
    SetCell, TableGateway, Timestamp,
};
use crate::config::Config;
use crate::error::{RecordError, Result};
use crate::keys::{self, Scope, ARCHIVE_PREFIX};
use crate::record::{self, RecordKind};
use crate::schema::{SchemaInitializer, SchemaReport};

/// A stored payload together with where and when it was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub row_key: String,
    pub family: String,
    pub qualifier: String,
    pub value: Bytes,
    pub timestamp: Timestamp,
}

impl StoredRecord {
    fn from_row(row: &Row, family: &str) -> Option<Self> {
        row.first_cell(family).map(|cell| Self {
            row_key: row.key().to_string(),
            family: family.to_string(),
            qualifier: cell.qualifier.clone(),
            value: cell.value.clone(),
            timestamp: cell.timestamp,
        })
    }

    /// Decode the payload as kind `R`
    pub fn decode<R: RecordKind>(&self) -> Result<R> {
        record::unmarshal(&self.value)
    }

    /// Payload as UTF-8 text, for logs and listings
    pub fn value_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

/// Proof that [`RecordStore::tear_down`] dropped the table
///
/// Not an error: the caller should stop serving and exit cleanly.
#[must_use = "the store is unusable after tear down; stop serving"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownSignal {
    pub table: String,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "table {} dropped, server is shutting down", self.table)
    }
}

/// Record storage over one backend table
///
/// Owns both backend clients for its whole life. [`tear_down`](Self::tear_down)
/// is the only call that releases them, and must not race other calls.
pub struct RecordStore<D, A> {
    data: D,
    admin: A,
    table: String,
}

impl<D: TableGateway, A: AdminGateway> RecordStore<D, A> {
    /// Wrap already-connected clients
    ///
    /// The schema must have been ensured (see [`crate::schema`]).
    pub fn new(data: D, admin: A, table: impl Into<String>) -> Self {
        Self {
            data,
            admin,
            table: table.into(),
        }
    }

    /// Ensure the schema through `admin`, then wrap both clients
    ///
    /// Fails with [`RecordError::StartupFatal`] if the schema cannot be
    /// ensured; no store is built in that case.
    pub fn connect(data: D, admin: A, table: &str, family: &str) -> Result<(Self, SchemaReport)> {
        let report = SchemaInitializer::new(&admin, table, family).ensure()?;
        Ok((Self::new(data, admin, table), report))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Store a new record under a freshly minted id, returning the id
    pub fn create_new<R: RecordKind>(&self, scope: &Scope, record: &R) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let row_key = self.write_record(scope, &id, record)?;

        tracing::info!(%row_key, qualifier = R::QUALIFIER, "record created");
        Ok(id)
    }

    /// Write `record` at `id`, whether or not it exists already
    pub fn update<R: RecordKind>(&self, scope: &Scope, id: &str, record: &R) -> Result<()> {
        let row_key = self.write_record(scope, id, record)?;

        tracing::info!(%row_key, qualifier = R::QUALIFIER, "record updated");
        Ok(())
    }

    fn write_record<R: RecordKind>(&self, scope: &Scope, id: &str, record: &R) -> Result<String> {
        check_scope(scope)?;

        let row_key = keys::active_key(scope, id);
        let payload = record::marshal(record)?;
        let qualifier = record::type_tag(record);

        self.set_cell(&row_key, scope.family(), qualifier, Bytes::from(payload))?;
        Ok(row_key)
    }

    fn set_cell(&self, row_key: &str, family: &str, qualifier: &str, value: Bytes) -> Result<()> {
        let cell = SetCell::new(family, qualifier, value, Timestamp::now());
        self.data.mutate_cell(&self.table, row_key, cell)?;
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Raw payload of record `id` stored under `qualifier`
    pub fn read_single(&self, scope: &Scope, qualifier: &str, id: &str) -> Result<StoredRecord> {
        let row_key = keys::active_key(scope, id);
        let stored = self.read_cell(scope, qualifier, &row_key)?;

        tracing::debug!(
            row_key = %stored.row_key,
            timestamp = %stored.timestamp,
            "{}",
            stored.value_lossy()
        );
        Ok(stored)
    }

    /// Record `id` decoded as kind `R`
    pub fn read<R: RecordKind>(&self, scope: &Scope, id: &str) -> Result<R> {
        let mut record: R = self.read_single(scope, R::QUALIFIER, id)?.decode()?;
        record.assign_id(id);
        Ok(record)
    }

    fn read_cell(&self, scope: &Scope, qualifier: &str, row_key: &str) -> Result<StoredRecord> {
        check_scope(scope)?;

        let filter = ColumnFilter::qualifier(qualifier);
        let row = self.data.read_row(&self.table, row_key, &filter)?;

        row.as_ref()
            .and_then(|row| StoredRecord::from_row(row, scope.family()))
            .ok_or_else(|| {
                tracing::warn!(%row_key, qualifier, "record not found");
                RecordError::NotFound {
                    row_key: row_key.to_string(),
                }
            })
    }

    /// Every active record of `scope` under `qualifier`, keyed by id
    ///
    /// Unordered. Callers needing key order should use
    /// [`scan_active`](Self::scan_active).
    pub fn read_all(&self, scope: &Scope, qualifier: &str) -> Result<HashMap<String, Bytes>> {
        let mut records = HashMap::new();

        self.scan_active(scope, qualifier, |id, stored| {
            records.insert(id.to_string(), stored.value);
            ControlFlow::Continue(())
        })?;

        Ok(records)
    }

    /// Every active record of kind `R` in `scope`, decoded, in key order
    pub fn read_all_records<R: RecordKind>(&self, scope: &Scope) -> Result<Vec<R>> {
        let mut records = Vec::new();
        let mut failure = None;

        self.scan_active(scope, R::QUALIFIER, |id, stored| match stored.decode::<R>() {
            Ok(mut record) => {
                record.assign_id(id);
                records.push(record);
                ControlFlow::Continue(())
            }
            Err(e) => {
                failure = Some(e);
                ControlFlow::Break(())
            }
        })?;

        match failure {
            Some(e) => Err(e),
            None => Ok(records),
        }
    }

    /// Stream active records of `scope` under `qualifier` in key order
    ///
    /// `on_record` receives the id and the stored payload. Returning
    /// `Break` stops the scan; records already delivered are unaffected.
    pub fn scan_active<F>(&self, scope: &Scope, qualifier: &str, mut on_record: F) -> Result<()>
    where
        F: FnMut(&str, StoredRecord) -> ControlFlow<()>,
    {
        check_scope(scope)?;

        let range = RowRange::prefix(scope.prefix());
        let filter = ColumnFilter::qualifier(qualifier);

        self.data.scan_rows(&self.table, &range, &filter, &mut |row| {
            let Some(stored) = StoredRecord::from_row(&row, scope.family()) else {
                // Matching column lives in another family
                return true;
            };
            let Some(id) = keys::id_from_key(scope, row.key()) else {
                return true;
            };
            on_record(id, stored).is_continue()
        })?;

        Ok(())
    }

    // =========================================================================
    // Soft Delete
    // =========================================================================

    /// Move record `id` into the archive namespace
    ///
    /// The archived copy keeps the original payload bytes and is written
    /// under `qualifier` as given, not re-derived from the payload.
    pub fn delete(&self, scope: &Scope, qualifier: &str, id: &str) -> Result<()> {
        let row_key = keys::active_key(scope, id);
        let stored = self.read_cell(scope, qualifier, &row_key)?;

        let audit: serde_json::Value =
            serde_json::from_slice(&stored.value).map_err(|source| RecordError::Decode {
                kind: "JSON",
                source,
            })?;

        let archived_key = keys::archive_key(&row_key);
        self.set_cell(&archived_key, scope.family(), qualifier, stored.value.clone())?;

        if let Err(e) = self.data.delete_row(&self.table, &row_key) {
            tracing::warn!(
                %row_key,
                %archived_key,
                error = %e,
                "record archived but active row remains"
            );
            return Err(e.into());
        }

        tracing::info!(%row_key, %archived_key, record = %audit, "record deleted");
        Ok(())
    }

    /// Every archived record under `qualifier`, in key order
    pub fn read_all_deleted(&self, qualifier: &str) -> Result<Vec<StoredRecord>> {
        let mut archived = Vec::new();

        self.scan_deleted(qualifier, |stored| {
            tracing::debug!(
                row_key = %stored.row_key,
                timestamp = %stored.timestamp,
                "{}",
                stored.value_lossy()
            );
            archived.push(stored);
            ControlFlow::Continue(())
        })?;

        Ok(archived)
    }

    /// Stream archived records under `qualifier` in key order
    pub fn scan_deleted<F>(&self, qualifier: &str, mut on_record: F) -> Result<()>
    where
        F: FnMut(StoredRecord) -> ControlFlow<()>,
    {
        let range = RowRange::prefix(ARCHIVE_PREFIX);
        let filter = ColumnFilter::qualifier(qualifier);

        self.data.scan_rows(&self.table, &range, &filter, &mut |row| {
            row.families()
                .filter_map(|family| StoredRecord::from_row(&row, family))
                .all(|stored| on_record(stored).is_continue())
        })?;

        Ok(())
    }

    // =========================================================================
    // Administration
    // =========================================================================

    /// Close the data client, drop the whole table, close the admin client
    ///
    /// Irreversible. Every later call on this store fails with
    /// [`RecordError::Transport`].
    pub fn tear_down(&self) -> Result<ShutdownSignal> {
        self.data.close()?;

        tracing::info!(table = %self.table, "deleting the table");
        self.admin.delete_table(&self.table)?;

        self.admin.close()?;

        Ok(ShutdownSignal {
            table: self.table.clone(),
        })
    }
}

impl RecordStore<LocalDataClient, LocalAdminClient> {
    /// Open the local backend described by `config` and bootstrap its schema
    ///
    /// On startup:
    /// 1. Validate the config
    /// 2. Open the backend (replaying the journal if one is configured)
    /// 3. Ensure table and column family through the admin client
    /// 4. Open the data client
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;

        let backend = LocalBackend::from_config(config).map_err(|source| {
            RecordError::StartupFatal {
                context: "could not open backend".to_string(),
                source,
            }
        })?;

        let admin = backend.admin_client();
        let report =
            SchemaInitializer::new(&admin, &config.table_name, &config.column_family).ensure()?;

        tracing::info!(
            project = %config.project,
            instance = %config.instance,
            table = %config.table_name,
            table_created = report.table_created,
            family_created = report.family_created,
            "record store ready"
        );

        Ok(Self::new(backend.data_client(), admin, config.table_name.clone()))
    }
}

fn check_scope(scope: &Scope) -> Result<()> {
    if scope.overlaps_archive() {
        return Err(RecordError::Config(format!(
            "scope prefix {:?} overlaps the {} namespace",
            scope.prefix(),
            ARCHIVE_PREFIX
        )));
    }
    Ok(())
}
