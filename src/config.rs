//! Configuration for recordkv
//!
//! Centralized startup configuration with sensible defaults. Supplied once
//! at process start and never mutated afterwards.

use std::path::PathBuf;

use crate::error::{RecordError, Result};
use crate::keys::Scope;

/// Main configuration for a recordkv process
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Backend Identity
    // -------------------------------------------------------------------------
    /// Project the backend instance belongs to
    pub project: String,

    /// Backend instance identifier
    pub instance: String,

    // -------------------------------------------------------------------------
    // Schema
    // -------------------------------------------------------------------------
    /// Table holding every record collection
    pub table_name: String,

    /// Column family created at startup and used by the default scope
    pub column_family: String,

    /// Row key prefix of the default scope
    pub key_prefix: String,

    // -------------------------------------------------------------------------
    // Local Backend
    // -------------------------------------------------------------------------
    /// Root directory for journal files. `None` keeps everything in memory.
    /// Internal structure:
    ///   {data_dir}/
    ///     └── {project}/{instance}/journal.log
    pub data_dir: Option<PathBuf>,

    /// Sync strategy: how often to fsync the journal
    pub journal_sync_strategy: JournalSyncStrategy,
}

/// Journal sync strategy
#[derive(Debug, Clone, Copy)]
pub enum JournalSyncStrategy {
    /// fsync after every mutation (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: "dev-project".to_string(),
            instance: "dev-instance".to_string(),
            table_name: "records".to_string(),
            column_family: "cf1".to_string(),
            key_prefix: "com.sr#test#messages".to_string(),
            data_dir: None,
            journal_sync_strategy: JournalSyncStrategy::EveryNEntries { count: 100 },
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject configurations the process cannot start with
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("project", &self.project),
            ("instance", &self.instance),
            ("table", &self.table_name),
            ("column family", &self.column_family),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(RecordError::Config(format!("the {} setting is required", name)));
            }
        }

        if let JournalSyncStrategy::EveryNEntries { count: 0 } = self.journal_sync_strategy {
            return Err(RecordError::Config(
                "journal sync interval must be at least one entry".to_string(),
            ));
        }

        Ok(())
    }

    /// The scope described by `column_family` and `key_prefix`
    pub fn default_scope(&self) -> Scope {
        Scope::new(&self.column_family, &self.key_prefix)
    }

    /// Journal location for this project/instance, if persistence is enabled
    pub fn journal_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| {
            dir.join(&self.project)
                .join(&self.instance)
                .join("journal.log")
        })
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the project identifier
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.config.project = project.into();
        self
    }

    /// Set the instance identifier
    pub fn instance(mut self, instance: impl Into<String>) -> Self {
        self.config.instance = instance.into();
        self
    }

    /// Set the target table name
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.config.table_name = name.into();
        self
    }

    /// Set the column family ensured at startup
    pub fn column_family(mut self, family: impl Into<String>) -> Self {
        self.config.column_family = family.into();
        self
    }

    /// Set the default scope's key prefix
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    /// Persist mutations under this directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = Some(path.into());
        self
    }

    /// Keep all tables in memory only
    pub fn in_memory(mut self) -> Self {
        self.config.data_dir = None;
        self
    }

    /// Set the journal sync strategy
    pub fn journal_sync_strategy(mut self, strategy: JournalSyncStrategy) -> Self {
        self.config.journal_sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
