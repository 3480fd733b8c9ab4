#![warn(missing_docs)]

//! fakedatafs content engine: synthetic file bytes generated on demand.
//!
//! A file is nothing but `(seed, size, identifier)`. Its content is split into
//! segments, each an independently seeded ChaCha8 stream, so any byte range can
//! be regenerated without touching earlier segments.
//!
//! Random access:  File → owning Segment → discard local offset → read
//! Sequential:     SequentialReader (positioned once) → read → read → ...

pub mod error;
pub mod file;
pub mod ident;
pub mod reader;
pub mod segment;

pub use error::{ContentError, Result};
pub use file::{File, MAX_SEGMENT_SIZE, MIN_SEGMENT_SIZE};
pub use ident::{path_identifier, seed_for_path};
pub use reader::{ReadOutcome, SequentialReader};
pub use segment::{Segment, SegmentStream, BLOCK_SIZE};
