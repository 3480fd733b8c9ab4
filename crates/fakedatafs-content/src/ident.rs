//! Deterministic identifiers and seeds derived from path strings.
//!
//! Both functions truncate a SHA-1 digest. Identifiers are only 32 bits wide,
//! so distinct paths can collide; nothing here detects or resolves that.

use sha1::{Digest, Sha1};

/// Returns the stable inode-like identifier for `path`.
///
/// The first four digest bytes are read little-endian. The value is identical
/// across processes and releases, which the FUSE attribute cache relies on.
///
/// Two different paths mapping to the same identifier is an accepted,
/// unhandled risk (for example `/file-198` and `/file-38290`).
pub fn path_identifier(path: &str) -> u64 {
    let hash = Sha1::digest(path.as_bytes());
    u32::from_le_bytes([hash[0], hash[1], hash[2], hash[3]]) as u64
}

/// Returns the content seed for an entry of kind `kind` at `path` below a
/// parent seeded with `parent_seed`.
pub fn seed_for_path(parent_seed: u64, kind: &str, path: &str) -> u64 {
    let material = format!("seed-{:016x}/{}/{}", parent_seed, kind, path);
    let hash = Sha1::digest(material.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash[..8]);
    u64::from_le_bytes(bytes)
}
