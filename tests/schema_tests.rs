//! Tests for SchemaInitializer
//!
//! These tests verify:
//! - Missing table and family are created
//! - Repeated runs create nothing and do not fail
//! - An existing table only gets the missing family
//! - Admin failures surface as StartupFatal

use std::sync::atomic::{AtomicUsize, Ordering};

use recordkv::backend::{AdminGateway, GatewayResult, LocalAdminClient, LocalBackend, TableInfo};
use recordkv::schema::{SchemaInitializer, SchemaReport};
use recordkv::{BackendError, RecordError};

// =============================================================================
// Helper Functions
// =============================================================================

/// Admin client that counts creates and can refuse to list tables
struct CountingAdmin {
    inner: LocalAdminClient,
    creates: AtomicUsize,
    unavailable: bool,
}

impl CountingAdmin {
    fn new(backend: &LocalBackend) -> Self {
        Self {
            inner: backend.admin_client(),
            creates: AtomicUsize::new(0),
            unavailable: false,
        }
    }
}

impl AdminGateway for CountingAdmin {
    fn list_tables(&self) -> GatewayResult<Vec<String>> {
        if self.unavailable {
            return Err(BackendError::Unavailable("admin endpoint down".to_string()));
        }
        self.inner.list_tables()
    }

    fn create_table(&self, name: &str) -> GatewayResult<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_table(name)
    }

    fn table_info(&self, name: &str) -> GatewayResult<TableInfo> {
        self.inner.table_info(name)
    }

    fn create_column_family(&self, table: &str, family: &str) -> GatewayResult<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_column_family(table, family)
    }

    fn delete_table(&self, name: &str) -> GatewayResult<()> {
        self.inner.delete_table(name)
    }

    fn close(&self) -> GatewayResult<()> {
        self.inner.close()
    }
}

// =============================================================================
// Bootstrap Tests
// =============================================================================

#[test]
fn test_creates_missing_table_and_family() {
    let backend = LocalBackend::in_memory();
    let admin = backend.admin_client();

    let report = SchemaInitializer::new(&admin, "records", "cf1").ensure().unwrap();

    assert_eq!(
        report,
        SchemaReport {
            table_created: true,
            family_created: true
        }
    );
    assert_eq!(admin.list_tables().unwrap(), vec!["records"]);
    assert_eq!(admin.table_info("records").unwrap().families, vec!["cf1"]);
}

#[test]
fn test_second_run_is_a_no_op() {
    let backend = LocalBackend::in_memory();
    let admin = CountingAdmin::new(&backend);

    SchemaInitializer::new(&admin, "records", "cf1").ensure().unwrap();
    let report = SchemaInitializer::new(&admin, "records", "cf1").ensure().unwrap();

    assert_eq!(report, SchemaReport::default());
    assert_eq!(admin.creates.load(Ordering::SeqCst), 2);
    assert_eq!(admin.list_tables().unwrap(), vec!["records"]);
    assert_eq!(admin.table_info("records").unwrap().families, vec!["cf1"]);
}

#[test]
fn test_existing_table_gets_missing_family() {
    let backend = LocalBackend::in_memory();
    let admin = backend.admin_client();
    admin.create_table("records").unwrap();
    admin.create_column_family("records", "other").unwrap();

    let report = SchemaInitializer::new(&admin, "records", "cf1").ensure().unwrap();

    assert!(!report.table_created);
    assert!(report.family_created);
    assert_eq!(
        admin.table_info("records").unwrap().families,
        vec!["cf1", "other"]
    );
}

#[test]
fn test_admin_failure_is_startup_fatal() {
    let backend = LocalBackend::in_memory();
    let mut admin = CountingAdmin::new(&backend);
    admin.unavailable = true;

    let err = SchemaInitializer::new(&admin, "records", "cf1").ensure().unwrap_err();

    match err {
        RecordError::StartupFatal { context, source } => {
            assert!(context.contains("table list"));
            assert!(matches!(source, BackendError::Unavailable(_)));
        }
        other => panic!("expected StartupFatal, got {:?}", other),
    }
    assert_eq!(admin.creates.load(Ordering::SeqCst), 0);
}

#[test]
fn test_closed_admin_is_startup_fatal() {
    let backend = LocalBackend::in_memory();
    let admin = backend.admin_client();
    admin.close().unwrap();

    let err = SchemaInitializer::new(&admin, "records", "cf1").ensure().unwrap_err();
    assert!(matches!(
        err,
        RecordError::StartupFatal {
            source: BackendError::Closed,
            ..
        }
    ));
}
