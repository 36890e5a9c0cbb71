//! Record Module
//!
//! The closed set of record kinds the store accepts.
//!
//! ## Responsibilities
//! - Give every kind a static column qualifier (its type tag)
//! - Serialize kinds to and from JSON payloads
//!
//! Several kinds may share one column family: the qualifier, not the table,
//! tells them apart.

mod codec;
mod message;
mod personal_info;

pub use codec::{marshal, unmarshal};
pub use message::Message;
pub use personal_info::{Address, ContactInfo, PersonalInfo, PhoneNumber};

use serde::de::DeserializeOwned;
use serde::Serialize;

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::Message {}
    impl Sealed for super::PersonalInfo {}
}

/// A record kind that can be stored
///
/// Sealed: the set of kinds is fixed by this crate.
pub trait RecordKind: Serialize + DeserializeOwned + sealed::Sealed {
    /// Column qualifier every record of this kind is written under
    const QUALIFIER: &'static str;

    /// Called with the id recovered from the row key when a record is read
    fn assign_id(&mut self, _id: &str) {}
}

impl RecordKind for Message {
    const QUALIFIER: &'static str = "Message";
}

impl RecordKind for PersonalInfo {
    const QUALIFIER: &'static str = "PersonalInfo";

    fn assign_id(&mut self, id: &str) {
        self.id = id.to_string();
    }
}

/// Column qualifier of a record, whether it is held by value or by reference
pub fn type_tag<R: RecordKind>(_record: &R) -> &'static str {
    R::QUALIFIER
}
