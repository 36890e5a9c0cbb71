//! Tests for the mutation journal
//!
//! These tests verify:
//! - Entry framing and checksum validation
//! - Sequential reads and LSN assignment
//! - Recovery from clean, torn and corrupted journals
//! - Verify mode (stats only, file untouched)
//! - Writer behaviour after a rejected or failed append

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use recordkv::config::JournalSyncStrategy;
use recordkv::journal::{
    JournalEntry, JournalReader, JournalRecovery, JournalWriter, Operation, HEADER_SIZE,
    MAX_ENTRY_SIZE,
};
use recordkv::BackendError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_journal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("journal.log");
    (temp_dir, path)
}

fn set_cell(i: usize) -> Operation {
    Operation::SetCell {
        table: "t".to_string(),
        key: format!("key{}", i),
        family: "cf1".to_string(),
        qualifier: "Message".to_string(),
        value: format!("value{}", i).into_bytes(),
        timestamp: i as u64,
    }
}

/// Write entries using JournalWriter (produces a well-formed journal)
fn write_entries_via_writer(path: &Path, count: usize) {
    let mut writer = JournalWriter::open(path, JournalSyncStrategy::EveryWrite, 1).unwrap();
    for i in 0..count {
        writer.append(set_cell(i)).unwrap();
    }
}

// =============================================================================
// Entry Tests
// =============================================================================

#[test]
fn test_entry_frame_layout() {
    let entry = JournalEntry::new(7, set_cell(1));
    let bytes = entry.serialize().unwrap();

    assert_eq!(&bytes[0..8], &7u64.to_be_bytes());
    let len = u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
    assert_eq!(bytes.len(), HEADER_SIZE + len);

    let crc = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let decoded = JournalEntry::deserialize(7, crc, &bytes[HEADER_SIZE..]).unwrap();
    assert_eq!(decoded, entry);
}

#[test]
fn test_entry_checksum_mismatch() {
    let entry = JournalEntry::new(1, set_cell(1));
    let mut bytes = entry.serialize().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    let crc = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let err = JournalEntry::deserialize(1, crc, &bytes[HEADER_SIZE..]).unwrap_err();
    assert!(matches!(err, BackendError::JournalCorruption(_)));
}

// =============================================================================
// Writer / Reader Tests
// =============================================================================

#[test]
fn test_writer_assigns_sequential_lsns() {
    let (_temp, path) = setup_temp_journal();
    let mut writer = JournalWriter::open(&path, JournalSyncStrategy::EveryWrite, 1).unwrap();

    assert_eq!(writer.current_lsn(), 0);
    assert_eq!(writer.append(set_cell(0)).unwrap(), 1);
    assert_eq!(writer.append(set_cell(1)).unwrap(), 2);
    assert_eq!(writer.current_lsn(), 2);
}

#[test]
fn test_writer_creates_parent_directories() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("project").join("instance").join("journal.log");

    JournalWriter::open(&path, JournalSyncStrategy::EveryWrite, 1).unwrap();

    assert!(path.exists());
}

#[test]
fn test_reader_returns_entries_in_order() {
    let (_temp, path) = setup_temp_journal();
    write_entries_via_writer(&path, 3);

    let entries: Vec<JournalEntry> = JournalReader::open(&path)
        .unwrap()
        .entries()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries.iter().map(|e| e.lsn).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(entries[2].operation, set_cell(2));
}

#[test]
fn test_batched_sync_still_readable() {
    let (_temp, path) = setup_temp_journal();
    {
        let mut writer =
            JournalWriter::open(&path, JournalSyncStrategy::EveryNEntries { count: 10 }, 1).unwrap();
        for i in 0..3 {
            writer.append(set_cell(i)).unwrap();
        }
    }

    let (entries, _) = JournalRecovery::recover(&path).unwrap();
    assert_eq!(entries.len(), 3);
}

#[test]
fn test_oversized_entry_rejected_without_touching_file() {
    let (_temp, path) = setup_temp_journal();
    let mut writer = JournalWriter::open(&path, JournalSyncStrategy::EveryWrite, 1).unwrap();
    writer.append(set_cell(0)).unwrap();
    let len_before = fs::metadata(&path).unwrap().len();

    let oversized = Operation::SetCell {
        table: "t".to_string(),
        key: "big".to_string(),
        family: "cf1".to_string(),
        qualifier: "Message".to_string(),
        value: vec![0u8; MAX_ENTRY_SIZE as usize + 1],
        timestamp: 1,
    };
    let err = writer.append(oversized).unwrap_err();

    assert!(matches!(err, BackendError::Serialization(_)));
    assert!(!writer.is_failed());
    assert_eq!(fs::metadata(&path).unwrap().len(), len_before);
    assert_eq!(writer.append(set_cell(1)).unwrap(), 2);
}

/// /dev/full accepts opens but fails every write with ENOSPC
#[cfg(target_os = "linux")]
#[test]
fn test_failed_append_refuses_later_appends() {
    let path = Path::new("/dev/full");
    if !path.exists() {
        return;
    }

    let mut writer = JournalWriter::open(path, JournalSyncStrategy::EveryWrite, 1).unwrap();

    let err = writer.append(set_cell(0)).unwrap_err();
    assert!(matches!(err, BackendError::Journal(_)));
    assert!(writer.is_failed());
    assert_eq!(writer.current_lsn(), 0);

    // The failed frame is never followed by acknowledged entries
    let err = writer.append(set_cell(1)).unwrap_err();
    assert!(matches!(err, BackendError::Unavailable(_)));
    assert!(writer.sync().is_err());
    assert_eq!(writer.current_lsn(), 0);
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_recover_missing_file() {
    let (_temp, path) = setup_temp_journal();

    let (entries, result) = JournalRecovery::recover(&path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_recovered, 0);
    assert_eq!(result.last_lsn, 0);
}

#[test]
fn test_recover_empty_file() {
    let (_temp, path) = setup_temp_journal();
    File::create(&path).unwrap();

    let (entries, result) = JournalRecovery::recover(&path).unwrap();

    assert!(entries.is_empty());
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_clean_journal() {
    let (_temp, path) = setup_temp_journal();
    write_entries_via_writer(&path, 5);

    let (entries, result) = JournalRecovery::recover(&path).unwrap();

    assert_eq!(entries.len(), 5);
    assert_eq!(result.entries_recovered, 5);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 5);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_truncates_partial_tail() {
    let (_temp, path) = setup_temp_journal();
    write_entries_via_writer(&path, 3);
    let clean_len = fs::metadata(&path).unwrap().len();

    // Simulate a crash mid-append: half of a frame
    let torn = JournalEntry::new(4, set_cell(3)).serialize().unwrap();
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&torn[..torn.len() / 2]).unwrap();
    drop(file);

    let (entries, result) = JournalRecovery::recover(&path).unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(result.entries_corrupted, 1);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&path).unwrap().len(), clean_len);
}

#[test]
fn test_recover_stops_at_corrupted_entry() {
    let (_temp, path) = setup_temp_journal();
    write_entries_via_writer(&path, 3);

    // Flip the last byte of the final entry's data
    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let (entries, result) = JournalRecovery::recover(&path).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(result.last_lsn, 2);
    assert_eq!(result.entries_corrupted, 1);
    assert!(result.was_truncated);
}

#[test]
fn test_append_after_recovery_continues_lsns() {
    let (_temp, path) = setup_temp_journal();
    write_entries_via_writer(&path, 2);

    let (_, result) = JournalRecovery::recover(&path).unwrap();
    let mut writer =
        JournalWriter::open(&path, JournalSyncStrategy::EveryWrite, result.last_lsn + 1).unwrap();
    assert_eq!(writer.append(set_cell(9)).unwrap(), 3);
    drop(writer);

    let (entries, _) = JournalRecovery::recover(&path).unwrap();
    assert_eq!(entries.last().unwrap().lsn, 3);
}

#[test]
fn test_verify_leaves_file_untouched() {
    let (_temp, path) = setup_temp_journal();
    write_entries_via_writer(&path, 2);
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[0xAB; 5]).unwrap();
    drop(file);
    let len_before = fs::metadata(&path).unwrap().len();

    let result = JournalRecovery::verify(&path).unwrap();

    assert_eq!(result.entries_recovered, 2);
    assert_eq!(result.entries_corrupted, 1);
    assert!(!result.was_truncated);
    assert_eq!(fs::metadata(&path).unwrap().len(), len_before);
}
