//! Record codec
//!
//! Records are stored as JSON so payloads stay human-inspectable in the
//! backend. Decoding is all-or-nothing.

use crate::error::{RecordError, Result};

use super::RecordKind;

/// Encode a record to its stored payload
pub fn marshal<R: RecordKind>(record: &R) -> Result<Vec<u8>> {
    serde_json::to_vec(record).map_err(|source| RecordError::Encode {
        kind: R::QUALIFIER,
        source,
    })
}

/// Decode a stored payload as kind `R`
pub fn unmarshal<R: RecordKind>(bytes: &[u8]) -> Result<R> {
    serde_json::from_slice(bytes).map_err(|source| RecordError::Decode {
        kind: R::QUALIFIER,
        source,
    })
}
