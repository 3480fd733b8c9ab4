//! Segments and their deterministic byte streams.
//!
//! A segment's content is the ChaCha8 output stream for the segment seed,
//! truncated to the segment size. The generator is always drawn in whole
//! `BLOCK_SIZE` blocks; the unused tail of the last block is kept in a small
//! leftover buffer and served first on the next call, so the bytes returned do
//! not depend on how callers size their reads.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;

/// Number of bytes drawn from the generator at a time.
///
/// Must stay a multiple of four: the generator emits 32-bit words and drops
/// the unused part of a word, which would make output depend on read sizes.
pub const BLOCK_SIZE: usize = 64;

/// Scratch size used while discarding bytes.
const DISCARD_CHUNK: usize = 16 * 1024;

/// One contiguous, independently reproducible slice of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    /// Generator seed for this segment's content.
    pub seed: u64,
    /// Length of the segment in bytes.
    pub size: u64,
}

impl Segment {
    /// Create a segment descriptor.
    pub fn new(seed: u64, size: u64) -> Self {
        Self { seed, size }
    }

    /// Open a fresh stream positioned at the first byte of this segment.
    pub fn stream(&self) -> SegmentStream {
        SegmentStream::new(self)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Segment seed {:#x}, len {}>", self.seed, self.size)
    }
}

/// Forward-only byte stream over one segment.
pub struct SegmentStream {
    rng: ChaCha8Rng,
    leftover: [u8; BLOCK_SIZE],
    /// Index of the next unread byte in `leftover`; `BLOCK_SIZE` when empty.
    leftover_pos: usize,
    remaining: u64,
}

impl SegmentStream {
    /// Open a stream for `segment`.
    pub fn new(segment: &Segment) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(segment.seed),
            leftover: [0u8; BLOCK_SIZE],
            leftover_pos: BLOCK_SIZE,
            remaining: segment.size,
        }
    }

    /// Bytes left before the end of the segment.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// True once every byte of the segment has been produced.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Fill `buf` with the next bytes of the segment.
    ///
    /// Returns the number of bytes written. A count below `buf.len()` means the
    /// segment is exhausted; 0 is returned from then on.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let want = (buf.len() as u64).min(self.remaining) as usize;
        if want == 0 {
            return 0;
        }
        let out = &mut buf[..want];

        let buffered = (BLOCK_SIZE - self.leftover_pos).min(want);
        out[..buffered]
            .copy_from_slice(&self.leftover[self.leftover_pos..self.leftover_pos + buffered]);
        self.leftover_pos += buffered;
        let mut pos = buffered;

        // leftover is drained here whenever more bytes are still wanted
        let whole = (want - pos) / BLOCK_SIZE * BLOCK_SIZE;
        if whole > 0 {
            self.rng.fill_bytes(&mut out[pos..pos + whole]);
            pos += whole;
        }

        if pos < want {
            self.rng.fill_bytes(&mut self.leftover);
            let tail = want - pos;
            out[pos..].copy_from_slice(&self.leftover[..tail]);
            self.leftover_pos = tail;
        }

        self.remaining -= want as u64;
        want
    }

    /// Consume and drop up to `n` bytes. Returns how many were dropped.
    ///
    /// The generator has no seek operation, so this costs as much as reading.
    pub fn discard(&mut self, n: u64) -> u64 {
        let mut scratch = [0u8; DISCARD_CHUNK];
        let mut dropped = 0u64;
        while dropped < n {
            let chunk = (n - dropped).min(DISCARD_CHUNK as u64) as usize;
            let got = self.read(&mut scratch[..chunk]);
            if got == 0 {
                break;
            }
            dropped += got as u64;
        }
        dropped
    }
}

impl fmt::Debug for SegmentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentStream")
            .field("remaining", &self.remaining)
            .field("buffered", &(BLOCK_SIZE - self.leftover_pos))
            .finish()
    }
}
