//! Synthetic files: deterministic segment partitioning and random access.

use crate::error::{ContentError, Result};
use crate::segment::{Segment, SegmentStream};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;
use tracing::trace;

/// Smallest size of any segment except the last: 512 KiB.
pub const MIN_SEGMENT_SIZE: u64 = 512 * 1024;
/// Largest size of any segment: 4 MiB.
pub const MAX_SEGMENT_SIZE: u64 = 4 * 1024 * 1024;

/// A file whose content is fully determined by `(seed, size)`.
///
/// Nothing is stored besides the segment table; the same arguments always
/// rebuild the same file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    seed: u64,
    size: u64,
    identifier: u64,
    segments: Vec<Segment>,
}

impl File {
    /// Build the file for `seed` and `size`.
    ///
    /// Segment lengths come from a ChaCha8 generator seeded once with `seed`
    /// and advanced one draw per segment. Segment `i` is seeded `seed ^ i`.
    pub fn new(seed: u64, size: u64, identifier: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut segments = Vec::new();
        let mut accumulated = 0u64;

        while accumulated < size {
            let remaining = size - accumulated;
            let len = if remaining > MIN_SEGMENT_SIZE {
                let upper = remaining.min(MAX_SEGMENT_SIZE);
                let span = upper - MIN_SEGMENT_SIZE + 1;
                MIN_SEGMENT_SIZE + rng.next_u64() % span
            } else {
                remaining
            };

            segments.push(Segment::new(seed ^ segments.len() as u64, len));
            accumulated += len;
        }

        trace!(seed, size, identifier, segments = segments.len(), "built file");

        Self {
            seed,
            size,
            identifier,
            segments,
        }
    }

    /// Seed the content was generated from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// File size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Identifier (inode number) of the file.
    pub fn identifier(&self) -> u64 {
        self.identifier
    }

    /// Segments in file order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Locate the segment holding byte `offset`.
    ///
    /// Returns the segment index and the offset local to that segment, or
    /// `None` when `offset >= size`.
    pub fn segment_at(&self, offset: u64) -> Option<(usize, u64)> {
        let mut start = 0u64;
        for (index, segment) in self.segments.iter().enumerate() {
            if offset < start + segment.size {
                return Some((index, offset - start));
            }
            start += segment.size;
        }
        None
    }

    /// Generate the whole content of the file.
    pub fn read_all(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.size as usize];
        let mut pos = 0usize;
        for segment in &self.segments {
            let end = pos + segment.size as usize;
            pos += segment.stream().read(&mut buf[pos..end]);
        }
        debug_assert_eq!(pos as u64, self.size);
        buf
    }

    /// Read into `buf` starting at absolute `offset`.
    ///
    /// Regenerates the owning segment from its start and discards up to the
    /// local offset, so the cost grows with the position inside the segment.
    /// Returns fewer bytes than `buf.len()` only when the end of the file is
    /// reached; `offset == size` yields `Ok(0)`.
    pub fn read_at(&self, buf: &mut [u8], offset: i64) -> Result<usize> {
        if offset < 0 {
            return Err(ContentError::NegativeOffset { offset });
        }
        let offset = offset as u64;
        if offset > self.size {
            return Err(ContentError::OffsetBeyondEof {
                offset,
                size: self.size,
            });
        }

        let Some((mut index, local)) = self.segment_at(offset) else {
            return Ok(0);
        };
        if buf.is_empty() {
            return Ok(0);
        }

        let mut stream = SegmentStream::new(&self.segments[index]);
        stream.discard(local);

        let mut filled = 0usize;
        loop {
            filled += stream.read(&mut buf[filled..]);
            if filled == buf.len() {
                break;
            }
            index += 1;
            match self.segments.get(index) {
                Some(next) => stream = SegmentStream::new(next),
                None => break,
            }
        }

        Ok(filled)
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<File seed {:#x}, size {}>", self.seed, self.size)
    }
}
