//! Forward-only reader over a whole file.
//!
//! `File::read_at` pays for regenerating the owning segment up to the offset
//! on every call. A `SequentialReader` pays that once when it is opened and
//! afterwards only for the bytes it hands out, which keeps a chunked scan of a
//! whole file linear in its size.

use crate::error::{ContentError, Result};
use crate::file::File;
use crate::segment::SegmentStream;
use std::io;
use std::sync::Arc;
use tracing::trace;

/// Result of one `SequentialReader::read` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Bytes written into the caller's buffer.
    pub n: usize,
    /// True when the reader reached the end of the file.
    pub ended: bool,
}

/// Stateful reader positioned at a byte offset of a file.
#[derive(Debug)]
pub struct SequentialReader {
    file: Arc<File>,
    /// Index of the segment `stream` belongs to.
    index: usize,
    /// `None` once every segment is consumed.
    stream: Option<SegmentStream>,
    position: u64,
}

impl SequentialReader {
    /// Open a reader whose first byte is `offset`.
    ///
    /// Whole segments before `offset` are skipped by their declared size; only
    /// the remainder inside the containing segment is regenerated and dropped.
    pub fn new(file: Arc<File>, offset: u64) -> Result<Self> {
        if offset > file.size() {
            return Err(ContentError::OffsetBeyondEof {
                offset,
                size: file.size(),
            });
        }

        let segments = file.segments();
        let mut skip = offset;
        let mut index = 0usize;
        while index < segments.len() && skip >= segments[index].size {
            skip -= segments[index].size;
            index += 1;
        }

        let stream = segments.get(index).map(|segment| {
            let mut stream = SegmentStream::new(segment);
            stream.discard(skip);
            stream
        });

        trace!(
            identifier = file.identifier(),
            offset,
            segment = index,
            local = skip,
            "opened sequential reader"
        );

        Ok(Self {
            file,
            index,
            stream,
            position: offset,
        })
    }

    /// Fill `buf` from the current position, crossing segment boundaries as
    /// needed.
    ///
    /// The count is below `buf.len()` only at end of file, in which case
    /// `ended` is set. `ended` is also set when `buf` is filled exactly up to
    /// the last byte.
    pub fn read(&mut self, buf: &mut [u8]) -> ReadOutcome {
        let mut filled = 0usize;
        while filled < buf.len() {
            let Some(stream) = self.stream.as_mut() else {
                break;
            };
            filled += stream.read(&mut buf[filled..]);
            if stream.is_exhausted() {
                self.index += 1;
                self.stream = self.file.segments().get(self.index).map(SegmentStream::new);
            }
        }

        self.position += filled as u64;
        ReadOutcome {
            n: filled,
            ended: self.is_ended(),
        }
    }

    /// Absolute offset of the next byte to be read.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes left until the end of the file.
    pub fn remaining(&self) -> u64 {
        self.file.size() - self.position
    }

    /// True when no bytes are left.
    pub fn is_ended(&self) -> bool {
        self.position == self.file.size()
    }

    /// The file being read.
    pub fn file(&self) -> &Arc<File> {
        &self.file
    }
}

impl io::Read for SequentialReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(SequentialReader::read(self, buf).n)
    }
}
