//! Error types for recordkv
//!
//! Two layers: [`BackendError`] is what a table gateway reports, and
//! [`RecordError`] is what the record store hands to its callers. Backend
//! errors pass through unchanged as [`RecordError::Transport`].

use thiserror::Error;

/// Result type alias using RecordError
pub type Result<T> = std::result::Result<T, RecordError>;

/// Errors reported by a table gateway (data or admin plane)
#[derive(Debug, Error)]
pub enum BackendError {
    // -------------------------------------------------------------------------
    // Schema Errors
    // -------------------------------------------------------------------------
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("table already exists: {0}")]
    TableExists(String),

    #[error("column family {family} not found in table {table}")]
    FamilyNotFound { table: String, family: String },

    #[error("column family {family} already exists in table {table}")]
    FamilyExists { table: String, family: String },

    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    #[error("client is closed")]
    Closed,

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    // -------------------------------------------------------------------------
    // Journal Errors
    // -------------------------------------------------------------------------
    #[error("journal IO error: {0}")]
    Journal(#[from] std::io::Error),

    #[error("journal corruption detected: {0}")]
    JournalCorruption(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Unified error type for record store operations
#[derive(Debug, Error)]
pub enum RecordError {
    // -------------------------------------------------------------------------
    // Per-request Errors
    // -------------------------------------------------------------------------
    #[error("record not found: {row_key}")]
    NotFound { row_key: String },

    #[error("payload does not decode as {kind}: {source}")]
    Decode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("record of kind {kind} could not be encoded: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    // -------------------------------------------------------------------------
    // Backend Errors
    // -------------------------------------------------------------------------
    #[error("transport error: {0}")]
    Transport(#[from] BackendError),

    // -------------------------------------------------------------------------
    // Startup Errors
    // -------------------------------------------------------------------------
    #[error("startup failed: {context}: {source}")]
    StartupFatal {
        context: String,
        #[source]
        source: BackendError,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl RecordError {
    /// True for errors that concern a single request and leave the store usable
    pub fn is_request_level(&self) -> bool {
        matches!(self, RecordError::NotFound { .. } | RecordError::Decode { .. })
    }
}
