//! Mbox archive reading and message normalization.
//!
//! [`MboxReader`] splits an mbox file into raw message byte blocks;
//! [`normalize`] turns one block into a canonical [`MailRecord`].
//!
//! The reader is deliberately lenient: it only cares about the `From `
//! envelope lines that separate messages, leaving everything else to the
//! MIME parser.

mod normalizer;

pub use normalizer::normalize;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Streaming reader over the messages of an mbox file.
///
/// Yields the raw bytes of each message, without the `From ` envelope
/// line. A line starting with `From ` begins a new message; quoted
/// `>From ` lines inside bodies pass through untouched.
pub struct MboxReader {
    reader: BufReader<File>,
    pending: Vec<u8>,
    line: Vec<u8>,
    done: bool,
}

impl MboxReader {
    /// Opens an mbox file for reading.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            pending: Vec::new(),
            line: Vec::new(),
            done: false,
        })
    }
}

impl Iterator for MboxReader {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
                Ok(0) => {
                    self.done = true;
                    if self.pending.is_empty() {
                        return None;
                    }
                    return Some(Ok(std::mem::take(&mut self.pending)));
                }
                Ok(_) => {
                    if self.line.starts_with(b"From ") {
                        if !self.pending.is_empty() {
                            return Some(Ok(std::mem::take(&mut self.pending)));
                        }
                        // Envelope line of the first message.
                    } else {
                        self.pending.extend_from_slice(&self.line);
                    }
                }
            }
        }
    }
}
