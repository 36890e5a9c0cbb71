//! # recordkv
//!
//! Typed record storage over a sorted wide-column backend:
//! - Several record kinds share one column family, told apart by column
//! - Row keys are `scope prefix + id`, so a scope is one prefix scan
//! - Deletes are soft: rows move to a `deleted#` namespace for audit
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        RecordStore                          │
//! │     create / read / read_all / update / delete / tear_down  │
//! └──────┬───────────────────┬──────────────────────┬───────────┘
//!        │                   │                      │
//!        ▼                   ▼                      ▼
//!   ┌──────────┐      ┌─────────────┐       ┌──────────────┐
//!   │   keys   │      │   record    │       │   backend    │
//!   │ (prefix, │      │ (qualifier, │       │ TableGateway │
//!   │ deleted#)│      │    JSON)    │       │ AdminGateway │
//!   └──────────┘      └─────────────┘       └──────┬───────┘
//!                                                  │
//!                                           ┌──────▼───────┐
//!                                           │   journal    │
//!                                           │  (optional)  │
//!                                           └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod keys;
pub mod record;
pub mod journal;
pub mod backend;
pub mod schema;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BackendError, RecordError, Result};
pub use config::Config;
pub use keys::Scope;
pub use record::{Message, PersonalInfo, RecordKind};
pub use store::{RecordStore, ShutdownSignal, StoredRecord};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of recordkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
