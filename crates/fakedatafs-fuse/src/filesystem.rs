//! FUSE adapter over the generated tree.
//!
//! Every request is answered from the in-memory [`Tree`]; file content is
//! produced on demand by the content engine. Sequential kernel reads resume
//! from readers parked in the [`ReadCache`].

use std::ffi::OsStr;
use std::os::raw::c_int;
use std::sync::Arc;
use std::time::SystemTime;

use fakedatafs_content::SequentialReader;
use fuser::{
    FileType as FuserFileType, Filesystem, KernelConfig, ReplyAttr, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, Request,
};
use tracing::{debug, info, warn};

use crate::config::FakeDataConfig;
use crate::error::{FsError, Result};
use crate::read_cache::ReadCache;
use crate::tree::{Tree, ROOT_INODE};

const BLOCK_SIZE: u32 = 4096;
const MAX_NAME_LEN: u32 = 255;
const FILE_PERM: u16 = 0o644;
const DIR_PERM: u16 = 0o555;

pub struct FakeDataFs {
    config: FakeDataConfig,
    tree: Tree,
    cache: Arc<ReadCache>,
    uid: u32,
    gid: u32,
    mounted_at: SystemTime,
}

impl FakeDataFs {
    pub fn new(config: FakeDataConfig, cache: Arc<ReadCache>) -> Self {
        let tree = Tree::new(&config);
        Self {
            config,
            tree,
            cache,
            uid: 0,
            gid: 0,
            mounted_at: SystemTime::now(),
        }
    }

    pub fn config(&self) -> &FakeDataConfig {
        &self.config
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn cache(&self) -> &Arc<ReadCache> {
        &self.cache
    }

    pub fn attr(&self, ino: u64) -> Result<fuser::FileAttr> {
        let (kind, size, perm, nlink) = if self.tree.is_dir(ino) {
            (FuserFileType::Directory, 0, DIR_PERM, 2)
        } else {
            let file = self.tree.file(ino)?;
            (FuserFileType::RegularFile, file.size(), FILE_PERM, 1)
        };
        Ok(fuser::FileAttr {
            ino,
            size,
            blocks: size.div_ceil(512),
            atime: self.mounted_at,
            mtime: self.mounted_at,
            ctime: self.mounted_at,
            crtime: self.mounted_at,
            kind,
            perm,
            nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        })
    }

    /// Accepts read-only opens of regular files.
    pub fn check_open(&self, ino: u64, flags: i32) -> Result<()> {
        self.tree.file(ino)?;
        if flags & libc::O_ACCMODE != libc::O_RDONLY {
            return Err(FsError::ReadOnly);
        }
        Ok(())
    }

    /// Serves up to `size` bytes of `ino` starting at `offset`.
    ///
    /// A reader parked at exactly this position is resumed; otherwise a fresh
    /// one is positioned. Unless the read reached the end of the file, the
    /// reader is parked again under the offset following the returned bytes.
    pub fn read_content(&self, ino: u64, offset: i64, size: u32) -> Result<Vec<u8>> {
        let file = self.tree.file(ino)?;
        let offset = u64::try_from(offset)
            .map_err(|_| fakedatafs_content::ContentError::NegativeOffset { offset })?;

        let mut reader = match self.cache.get(ino, offset) {
            Some(reader) => reader,
            None => SequentialReader::new(Arc::clone(file), offset)?,
        };

        let mut buf = vec![0u8; size as usize];
        let outcome = reader.read(&mut buf);
        buf.truncate(outcome.n);

        if !outcome.ended {
            self.cache.put(ino, reader.position(), reader);
        }
        Ok(buf)
    }

    /// Directory listing with `.` and `..` first, as `(ino, kind, name)`.
    pub fn listing(&self, ino: u64) -> Result<Vec<(u64, FuserFileType, &str)>> {
        let entries = self.tree.entries(ino)?;
        let mut out = Vec::with_capacity(entries.len() + 2);
        out.push((ROOT_INODE, FuserFileType::Directory, "."));
        out.push((ROOT_INODE, FuserFileType::Directory, ".."));
        out.extend(
            entries
                .iter()
                .map(|e| (e.ino(), FuserFileType::RegularFile, e.name.as_str())),
        );
        Ok(out)
    }
}

impl Filesystem for FakeDataFs {
    fn init(
        &mut self,
        req: &Request<'_>,
        _config: &mut KernelConfig,
    ) -> std::result::Result<(), c_int> {
        self.uid = req.uid();
        self.gid = req.gid();
        self.mounted_at = SystemTime::now();
        info!(
            seed = self.tree.seed(),
            files = self.tree.len(),
            uid = self.uid,
            gid = self.gid,
            "fakedatafs filesystem init"
        );
        Ok(())
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name_str = name.to_string_lossy();
        debug!("lookup parent={} name={}", parent, name_str);

        let ino = match self.tree.lookup(parent, &name_str) {
            Ok(entry) => entry.ino(),
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };
        match self.attr(ino) {
            Ok(attr) => reply.entry(&self.config.entry_timeout(), &attr, 0),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        debug!("getattr ino={}", ino);
        match self.attr(ino) {
            Ok(attr) => reply.attr(&self.config.attr_timeout(), &attr),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        debug!("open ino={} flags={:#o}", ino, flags);
        match self.check_open(ino, flags) {
            Ok(()) => reply.opened(0, 0),
            Err(e) => {
                debug!("open ino={} rejected: {}", ino, e);
                reply.error(e.to_errno());
            }
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        debug!("read ino={} offset={} size={}", ino, offset, size);
        match self.read_content(ino, offset, size) {
            Ok(data) => reply.data(&data),
            Err(e) => {
                warn!("read ino={} offset={} failed: {}", ino, offset, e);
                reply.error(e.to_errno());
            }
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        debug!("release ino={}", ino);
        reply.ok();
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        debug!("opendir ino={}", ino);
        if self.tree.is_dir(ino) {
            reply.opened(0, 0);
        } else {
            let err = match self.tree.file(ino) {
                Ok(_) => FsError::NotDirectory { ino },
                Err(e) => e,
            };
            reply.error(err.to_errno());
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        debug!("readdir ino={} offset={}", ino, offset);

        let listing = match self.listing(ino) {
            Ok(l) => l,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };

        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, (child, kind, name)) in listing.into_iter().enumerate().skip(skip) {
            if reply.add(child, (i + 1) as i64, kind, name) {
                return;
            }
        }
        reply.ok();
    }

    fn releasedir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        debug!("releasedir");
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        debug!("statfs");
        let blocks = self.tree.total_size().div_ceil(u64::from(BLOCK_SIZE));
        let files = self.tree.len() as u64 + 1;
        reply.statfs(blocks, 0, 0, files, 0, BLOCK_SIZE, MAX_NAME_LEN, BLOCK_SIZE);
    }
}
