//! Mutation Journal Module
//!
//! Append-only log that makes the local backend durable.
//!
//! ## Responsibilities
//! - Append every accepted table/row mutation before it is applied
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Replay on open, dropping torn or corrupted tails
//! - Rewrite from live state once dropped tables or dead entries dominate
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Entry 1                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Entry 2                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//!
//! All integers are big-endian. `Data` is the bincode encoding of a
//! [`JournalEntry`] and the CRC covers `Data` only.

mod entry;
mod writer;
mod reader;
mod recovery;
mod compaction;

pub use entry::{JournalEntry, Operation, HEADER_SIZE, MAX_ENTRY_SIZE};
pub use writer::JournalWriter;
pub use reader::JournalReader;
pub use recovery::{JournalRecovery, RecoveryResult};
pub use compaction::JournalCompaction;
