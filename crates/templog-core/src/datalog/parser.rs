//! Datalog line parsing
//!
//! Turns the raw byte stream from the device into lines, and lines into
//! [`Record`]s.

use super::{Record, MIN_FIELDS};

/// Parse one datalog line.
///
/// Returns `None` when the line has fewer than four comma-separated fields.
/// Fields are taken verbatim; anything past the fourth is ignored.
pub fn parse_line(line: &str) -> Option<Record> {
    let parts: Vec<&str> = line.splitn(MIN_FIELDS + 1, ',').collect();
    if parts.len() < MIN_FIELDS {
        return None;
    }
    Some(Record::new(parts[0], parts[1], parts[2], parts[3]))
}

/// Accumulates bytes from the device and splits them into lines.
///
/// Lines end at `\n`; one trailing `\r` is dropped so CRLF devices produce the
/// same lines as LF devices. An unterminated tail stays buffered until the
/// rest of it arrives.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Bytes received since the last complete line
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Drop any partial line
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
