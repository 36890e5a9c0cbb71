//! Schema bootstrap
//!
//! Ensures the target table and column family exist before the store serves
//! anything. Check-then-create: existing objects are detected up front, never
//! by swallowing an "already exists" error, so repeated runs issue no
//! creates at all.

use crate::backend::AdminGateway;
use crate::error::{BackendError, RecordError, Result};

/// What a bootstrap run changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchemaReport {
    pub table_created: bool,
    pub family_created: bool,
}

/// Idempotent startup routine for one table and one column family
pub struct SchemaInitializer<'a, A: AdminGateway + ?Sized> {
    admin: &'a A,
    table: &'a str,
    family: &'a str,
}

impl<'a, A: AdminGateway + ?Sized> SchemaInitializer<'a, A> {
    pub fn new(admin: &'a A, table: &'a str, family: &'a str) -> Self {
        Self {
            admin,
            table,
            family,
        }
    }

    /// Create whatever is missing
    ///
    /// Every failure is [`RecordError::StartupFatal`]; the caller must not go
    /// on to serve requests.
    pub fn ensure(&self) -> Result<SchemaReport> {
        let mut report = SchemaReport::default();

        let tables = self
            .admin
            .list_tables()
            .map_err(|e| fatal("could not fetch table list", e))?;

        if !tables.iter().any(|t| t == self.table) {
            tracing::info!(table = self.table, "creating table");
            self.admin
                .create_table(self.table)
                .map_err(|e| fatal(&format!("could not create table {}", self.table), e))?;
            report.table_created = true;
        }

        let info = self
            .admin
            .table_info(self.table)
            .map_err(|e| fatal(&format!("could not read info for table {}", self.table), e))?;

        if !info.families.iter().any(|f| f == self.family) {
            tracing::info!(table = self.table, family = self.family, "creating column family");
            self.admin
                .create_column_family(self.table, self.family)
                .map_err(|e| {
                    fatal(&format!("could not create column family {}", self.family), e)
                })?;
            report.family_created = true;
        }

        Ok(report)
    }
}

fn fatal(context: &str, source: BackendError) -> RecordError {
    tracing::error!(%source, "{}", context);
    RecordError::StartupFatal {
        context: context.to_string(),
        source,
    }
}
