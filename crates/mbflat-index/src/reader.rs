//! Offset-addressed line reads.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use crate::error::Result;

/// A seek-based reader over a filtered NDJSON file.
///
/// Workers hold independent readers over the same file; reads are
/// read-only and need no locking.
#[derive(Debug)]
pub struct LineReader {
    reader: BufReader<File>,
}

impl LineReader {
    /// Open a filtered file for offset-addressed reads.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
        })
    }

    /// Read the single line starting at `offset`.
    ///
    /// The offset index invariant guarantees that seeking to a recorded
    /// offset and reading one line yields the record whose `id` equals the
    /// index key. The trailing newline is stripped.
    pub fn line_at(&mut self, offset: u64) -> Result<String> {
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}
