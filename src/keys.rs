//! Row key construction
//!
//! Active rows live at `prefix + id`. Archived rows live at
//! `deleted#` + the original row key, a namespace no active key can enter
//! because every scope prefix is validated against it.
//!
//! Keys are plain concatenations, so a scan over one prefix also matches any
//! scope whose prefix extends it. Scopes that nest should end their prefix
//! with a delimiter such as `#`.

use std::fmt;

/// Prefix of every archived row key
pub const ARCHIVE_PREFIX: &str = "deleted#";

/// A logical collection of records: a column family plus a row key prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    family: String,
    prefix: String,
}

impl Scope {
    pub fn new(family: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            prefix: prefix.into(),
        }
    }

    /// Column family the scope's records are written to
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Row key prefix shared by every active record in the scope
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// True if the prefix would place active rows inside the archive namespace
    pub fn overlaps_archive(&self) -> bool {
        self.prefix.starts_with(ARCHIVE_PREFIX) || ARCHIVE_PREFIX.starts_with(&self.prefix)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.prefix)
    }
}

/// Row key of the active record `id` in `scope`
pub fn active_key(scope: &Scope, id: &str) -> String {
    let mut key = String::with_capacity(scope.prefix.len() + id.len());
    key.push_str(&scope.prefix);
    key.push_str(id);
    key
}

/// Row key an active row is relocated to when it is soft-deleted
pub fn archive_key(row_key: &str) -> String {
    format!("{}{}", ARCHIVE_PREFIX, row_key)
}

/// Recover the record id from an active row key
///
/// Returns `None` when the key does not belong to `scope`.
pub fn id_from_key<'a>(scope: &Scope, row_key: &'a str) -> Option<&'a str> {
    row_key.strip_prefix(scope.prefix.as_str())
}

/// Recover the original row key from an archived row key
pub fn original_key(archived_key: &str) -> Option<&str> {
    archived_key.strip_prefix(ARCHIVE_PREFIX)
}
