//! The generated directory tree: one root directory holding synthetic files.

use crate::config::FakeDataConfig;
use crate::error::{FsError, Result};
use fakedatafs_content::{path_identifier, seed_for_path, File};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Inode the kernel uses for the mount root.
pub const ROOT_INODE: u64 = 1;

#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub file: Arc<File>,
}

impl DirEntry {
    pub fn ino(&self) -> u64 {
        self.file.identifier()
    }
}

#[derive(Debug)]
pub struct Tree {
    seed: u64,
    entries: Vec<DirEntry>,
    by_name: HashMap<String, usize>,
    by_ino: HashMap<u64, usize>,
}

impl Tree {
    pub fn new(config: &FakeDataConfig) -> Self {
        Self::generate(config.seed, config.files_per_dir, config.max_size_bytes())
    }

    /// Draws `count` file names and sizes from a generator seeded with `seed`.
    /// File sizes fall in `[0, max_size)`.
    pub fn generate(seed: u64, count: usize, max_size: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut drawn: Vec<(String, u64)> = Vec::with_capacity(count);
        let mut seen = HashSet::with_capacity(count);

        for _ in 0..count {
            let n = rng.next_u64() >> 1;
            let size = if max_size == 0 {
                0
            } else {
                rng.next_u64() % max_size
            };
            let name = format!("file-{}", n);
            if !seen.insert(name.clone()) {
                debug!(name = %name, "duplicate file name drawn, skipping");
                continue;
            }
            drawn.push((name, size));
        }
        drawn.sort_by(|a, b| a.0.cmp(&b.0));

        let mut entries = Vec::with_capacity(drawn.len());
        let mut by_name = HashMap::with_capacity(drawn.len());
        let mut by_ino = HashMap::with_capacity(drawn.len());
        for (name, size) in drawn {
            let path = format!("/{}", name);
            let file = File::new(
                seed_for_path(seed, "file", &path),
                size,
                path_identifier(&path),
            );
            let idx = entries.len();
            let ino = file.identifier();
            if ino == ROOT_INODE || by_ino.contains_key(&ino) {
                warn!(path = %path, ino, "identifier collision, inode serves the first file");
            }
            if ino != ROOT_INODE {
                by_ino.entry(ino).or_insert(idx);
            }
            by_name.insert(name.clone(), idx);
            entries.push(DirEntry {
                name,
                file: Arc::new(file),
            });
        }

        debug!(seed, files = entries.len(), "directory tree generated");
        Tree {
            seed,
            entries,
            by_name,
            by_ino,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn is_dir(&self, ino: u64) -> bool {
        ino == ROOT_INODE
    }

    pub fn lookup(&self, parent: u64, name: &str) -> Result<&DirEntry> {
        if !self.is_dir(parent) {
            return if self.by_ino.contains_key(&parent) {
                Err(FsError::NotDirectory { ino: parent })
            } else {
                Err(FsError::NotFound { ino: parent })
            };
        }
        self.by_name
            .get(name)
            .map(|&idx| &self.entries[idx])
            .ok_or_else(|| FsError::NoEntry {
                parent,
                name: name.to_string(),
            })
    }

    pub fn file(&self, ino: u64) -> Result<&Arc<File>> {
        if self.is_dir(ino) {
            return Err(FsError::IsDirectory { ino });
        }
        self.by_ino
            .get(&ino)
            .map(|&idx| &self.entries[idx].file)
            .ok_or(FsError::NotFound { ino })
    }

    pub fn entries(&self, ino: u64) -> Result<&[DirEntry]> {
        if self.is_dir(ino) {
            Ok(&self.entries)
        } else if self.by_ino.contains_key(&ino) {
            Err(FsError::NotDirectory { ino })
        } else {
            Err(FsError::NotFound { ino })
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.file.size()).sum()
    }
}
