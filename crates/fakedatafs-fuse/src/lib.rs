//! fakedatafs FUSE daemon.
//!
//! Serves a generated directory of synthetic files as a read-only FUSE
//! mount. Names, sizes and content are all derived from one root seed, so a
//! given configuration always produces the same tree byte for byte.

pub mod cli;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod mount;
pub mod read_cache;
pub mod tree;

pub use config::{ConfigError, FakeDataConfig, ReadCacheConfig};
pub use error::{FsError, Result};
pub use filesystem::FakeDataFs;
pub use mount::{MountError, MountOptions};
pub use read_cache::{spawn_sweeper, ReadCache, ReadCacheStats};
pub use tree::{DirEntry, Tree, ROOT_INODE};
