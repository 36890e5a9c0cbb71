//! Journal Reader
//!
//! Reads framed entries sequentially from a journal file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::BackendError;

use super::{JournalEntry, HEADER_SIZE, MAX_ENTRY_SIZE};

/// Reads entries from the journal file
pub struct JournalReader {
    reader: BufReader<File>,

    /// Byte offset just past the last fully read entry
    position: u64,
}

impl JournalReader {
    /// Open a journal file for reading
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next entry
    ///
    /// - `Ok(None)` at a clean end of file
    /// - `Err(JournalCorruption)` for a torn frame or a bad checksum
    pub fn next_entry(&mut self) -> Result<Option<JournalEntry>, BackendError> {
        let mut header = [0u8; HEADER_SIZE];
        match read_full(&mut self.reader, &mut header)? {
            0 => return Ok(None),
            n if n < HEADER_SIZE => {
                return Err(BackendError::JournalCorruption(format!(
                    "partial header at offset {}: {} of {} bytes",
                    self.position, n, HEADER_SIZE
                )))
            }
            _ => {}
        }

        let lsn = u64::from_be_bytes([
            header[0], header[1], header[2], header[3], header[4], header[5], header[6], header[7],
        ]);
        let crc = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
        let len = u32::from_be_bytes([header[12], header[13], header[14], header[15]]);

        if len > MAX_ENTRY_SIZE {
            return Err(BackendError::JournalCorruption(format!(
                "entry length {} at offset {} exceeds maximum {}",
                len, self.position, MAX_ENTRY_SIZE
            )));
        }

        let mut data = vec![0u8; len as usize];
        let read = read_full(&mut self.reader, &mut data)?;
        if read < data.len() {
            return Err(BackendError::JournalCorruption(format!(
                "partial entry at offset {}: {} of {} bytes",
                self.position, read, len
            )));
        }

        let entry = JournalEntry::deserialize(lsn, crc, &data)?;
        self.position += (HEADER_SIZE + data.len()) as u64;

        Ok(Some(entry))
    }

    /// Byte offset just past the last valid entry read so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Iterate over entries until end of file or the first error
    pub fn entries(self) -> JournalIterator {
        JournalIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over journal entries
pub struct JournalIterator {
    reader: JournalReader,
    done: bool,
}

impl Iterator for JournalIterator {
    type Item = Result<JournalEntry, BackendError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` as far as the file allows, returning the bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, BackendError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
