//! Tests for record kinds, the codec and row keys
//!
//! These tests verify:
//! - JSON round trips for both kinds
//! - PascalCase field names on personal info payloads
//! - Decode failures for payloads of the wrong shape
//! - Type tags
//! - Active / archive key construction and id recovery

use recordkv::keys::{self, Scope, ARCHIVE_PREFIX};
use recordkv::record::{
    self, marshal, type_tag, unmarshal, Address, ContactInfo, PhoneNumber,
};
use recordkv::{Message, PersonalInfo, RecordError, RecordKind};

// =============================================================================
// Helper Functions
// =============================================================================

fn sample_person() -> PersonalInfo {
    PersonalInfo {
        id: "1234".to_string(),
        first_name: "Grace".to_string(),
        middle_name: "Brewster".to_string(),
        last_name: "Hopper".to_string(),
        age: "85".to_string(),
        contact_info: ContactInfo {
            addresses: vec![
                Address {
                    street_name: "1 Navy Way".to_string(),
                    city: "Arlington".to_string(),
                    state: "VA".to_string(),
                    zipcode: "22202".to_string(),
                },
                Address::default(),
            ],
            phone_numbers: vec![PhoneNumber {
                area_code: "703".to_string(),
                number: "5550123".to_string(),
                extension: "9".to_string(),
                kind: "work".to_string(),
            }],
        },
    }
}

// =============================================================================
// Codec Tests
// =============================================================================

#[test]
fn test_message_round_trip() {
    let message = Message::new("hi there");

    let bytes = marshal(&message).unwrap();

    assert_eq!(bytes, br#"{"text":"hi there"}"#.to_vec());
    assert_eq!(unmarshal::<Message>(&bytes).unwrap(), message);
}

#[test]
fn test_personal_info_round_trip() {
    let person = sample_person();

    let bytes = marshal(&person).unwrap();

    assert_eq!(unmarshal::<PersonalInfo>(&bytes).unwrap(), person);
}

#[test]
fn test_personal_info_uses_pascal_case_fields() {
    let value: serde_json::Value = serde_json::from_slice(&marshal(&sample_person()).unwrap()).unwrap();

    assert_eq!(value["ID"], "1234");
    assert_eq!(value["FirstName"], "Grace");
    assert_eq!(value["ContactInfo"]["Addresses"][0]["Zipcode"], "22202");
    assert_eq!(value["ContactInfo"]["PhoneNumbers"][0]["Type"], "work");
}

#[test]
fn test_personal_info_missing_fields_default() {
    let person: PersonalInfo = unmarshal(br#"{"FirstName":"Solo"}"#).unwrap();

    assert_eq!(person.first_name, "Solo");
    assert!(person.contact_info.addresses.is_empty());
}

#[test]
fn test_unmarshal_garbage_is_decode_error() {
    let err = unmarshal::<Message>(b"\x00\x01 not json").unwrap_err();

    assert!(matches!(err, RecordError::Decode { kind: "Message", .. }));
}

#[test]
fn test_unmarshal_wrong_shape_is_decode_error() {
    let err = unmarshal::<Message>(br#"{"FirstName":"Grace"}"#).unwrap_err();
    assert!(matches!(err, RecordError::Decode { .. }));

    let err = unmarshal::<PersonalInfo>(br#"{"Age": 42}"#).unwrap_err();
    assert!(matches!(err, RecordError::Decode { kind: "PersonalInfo", .. }));
}

// =============================================================================
// Type Tag Tests
// =============================================================================

#[test]
fn test_type_tag_same_for_value_and_reference() {
    let message = Message::new("x");
    let by_ref: &Message = &message;

    assert_eq!(type_tag(&message), "Message");
    assert_eq!(type_tag(by_ref), type_tag(&message));
    assert_eq!(type_tag(&sample_person()), "PersonalInfo");
}

#[test]
fn test_assign_id_only_affects_personal_info() {
    let mut person = PersonalInfo::default();
    person.assign_id("abc");
    assert_eq!(person.id, "abc");

    let mut message = Message::new("unchanged");
    message.assign_id("abc");
    assert_eq!(message, Message::new("unchanged"));
}

// =============================================================================
// Key Tests
// =============================================================================

#[test]
fn test_active_key_is_plain_concatenation() {
    let scope = Scope::new("cf1", "com.sr#test#messages");

    assert_eq!(
        keys::active_key(&scope, "0f8b"),
        "com.sr#test#messages0f8b"
    );
}

#[test]
fn test_archive_key_prefixes_row_key() {
    assert_eq!(
        keys::archive_key("com.sr#test#messages0f8b"),
        "deleted#com.sr#test#messages0f8b"
    );
    assert_eq!(ARCHIVE_PREFIX, "deleted#");
}

#[test]
fn test_id_recovery_does_not_depend_on_width() {
    let scope = Scope::new("cf1", "p#");

    assert_eq!(keys::id_from_key(&scope, "p#short"), Some("short"));
    assert_eq!(
        keys::id_from_key(&scope, "p#a-much-longer-identifier-than-a-uuid-would-be"),
        Some("a-much-longer-identifier-than-a-uuid-would-be")
    );
    assert_eq!(keys::id_from_key(&scope, "q#other"), None);
}

#[test]
fn test_original_key_from_archive() {
    let archived = keys::archive_key("p#id");

    assert_eq!(keys::original_key(&archived), Some("p#id"));
    assert_eq!(keys::original_key("p#id"), None);
}

#[test]
fn test_scope_archive_overlap() {
    assert!(Scope::new("cf1", "deleted#x").overlaps_archive());
    assert!(Scope::new("cf1", "del").overlaps_archive());
    assert!(Scope::new("cf1", "").overlaps_archive());
    assert!(!Scope::new("cf1", "com.sr#test#messages").overlaps_archive());
}

#[test]
fn test_record_module_reexports_codec() {
    let bytes = record::marshal(&Message::new("r")).unwrap();
    assert_eq!(record::unmarshal::<Message>(&bytes).unwrap().text, "r");
}
