//! Subscriber personal info
//!
//! Field names are serialized in PascalCase so payloads written by other
//! clients of the same table decode unchanged.

use serde::{Deserialize, Serialize};

/// A subscriber's personal information
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PersonalInfo {
    /// Filled from the row key when listing; not authoritative in the payload
    #[serde(rename = "ID")]
    pub id: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub age: String,
    pub contact_info: ContactInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ContactInfo {
    pub addresses: Vec<Address>,
    pub phone_numbers: Vec<PhoneNumber>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Address {
    pub street_name: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PhoneNumber {
    pub area_code: String,
    pub number: String,
    pub extension: String,
    #[serde(rename = "Type")]
    pub kind: String,
}
