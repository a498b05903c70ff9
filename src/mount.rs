//! FUSE transport over the node façade.
//!
//! The kernel speaks in inode numbers while the façade speaks in paths, so this layer
//! owns the inode table: the root is `FUSE_ROOT_ID`, files use their row identity, and
//! directories get stable numbers from a range rows never reach.

use std::{
    ffi::OsStr,
    path::Path,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use ahash::AHashMap;
use fuser::{
    FUSE_ROOT_ID, FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow,
    consts::FOPEN_KEEP_CACHE,
};
use libc::{EINVAL, EISDIR, ENOENT, ENOTDIR, ENOTSUP};
use tracing::{debug, info, warn};

use crate::{
    errors::RowFsError,
    node::{Node, NodeAttr, RowFs},
    resolver::{self, EntryKind},
    store::RowStore,
};

const TTL: Duration = Duration::from_secs(1);
const BLOCK_SIZE: u32 = 512;
/// First inode handed out to directories and to rows whose identity cannot be used.
pub const DYNAMIC_INODE_BASE: u64 = 1 << 48;

pub struct InodeTable<S> {
    nodes: AHashMap<u64, Node<S>>,
    dir_inodes: AHashMap<String, u64>,
    file_inodes: AHashMap<i64, u64>,
    next_dynamic: u64,
}

impl<S: RowStore> InodeTable<S> {
    pub fn new(fs: &RowFs<S>) -> Self {
        let mut table = Self {
            nodes: AHashMap::new(),
            dir_inodes: AHashMap::new(),
            file_inodes: AHashMap::new(),
            next_dynamic: DYNAMIC_INODE_BASE,
        };
        table.dir_inodes.insert(String::new(), FUSE_ROOT_ID);
        table
            .nodes
            .insert(FUSE_ROOT_ID, Node::Directory(fs.root()));
        table
    }

    pub fn get(&self, ino: u64) -> Option<&Node<S>> {
        self.nodes.get(&ino)
    }

    /// Stores a freshly resolved node, replacing whatever was cached for the same
    /// directory path or row.
    pub fn insert(&mut self, node: Node<S>) -> u64 {
        let ino = match &node {
            Node::Directory(dir) => self.dir_inode(dir.prefix()),
            Node::File(file) => self.file_inode(file.id()),
        };
        self.nodes.insert(ino, node);
        ino
    }

    pub fn dir_inode(&mut self, path: &str) -> u64 {
        if let Some(ino) = self.dir_inodes.get(path) {
            return *ino;
        }
        let ino = self.allocate();
        self.dir_inodes.insert(path.to_string(), ino);
        ino
    }

    pub fn file_inode(&mut self, id: i64) -> u64 {
        if let Some(ino) = self.file_inodes.get(&id) {
            return *ino;
        }
        let ino = match u64::try_from(id) {
            Ok(ino) if ino > FUSE_ROOT_ID && ino < DYNAMIC_INODE_BASE => ino,
            _ => self.allocate(),
        };
        self.file_inodes.insert(id, ino);
        ino
    }

    fn allocate(&mut self) -> u64 {
        let ino = self.next_dynamic;
        self.next_dynamic += 1;
        ino
    }
}

pub struct RowFsMount<S> {
    inodes: InodeTable<S>,
    uid: u32,
    gid: u32,
    mounted_at: SystemTime,
}

impl<S: RowStore> RowFsMount<S> {
    pub fn new(fs: RowFs<S>) -> Self {
        // SAFETY: getuid/getgid have no preconditions and cannot fail.
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        Self {
            inodes: InodeTable::new(&fs),
            uid,
            gid,
            mounted_at: SystemTime::now(),
        }
    }

    fn file_attr(&self, ino: u64, attr: NodeAttr) -> FileAttr {
        let kind = match attr.kind {
            EntryKind::File => FileType::RegularFile,
            EntryKind::Directory => FileType::Directory,
        };
        FileAttr {
            ino,
            size: attr.size,
            blocks: attr.size.div_ceil(u64::from(BLOCK_SIZE)),
            atime: self.mounted_at,
            mtime: self.mounted_at,
            ctime: self.mounted_at,
            crtime: UNIX_EPOCH,
            kind,
            perm: attr.perm,
            nlink: if kind == FileType::Directory { 2 } else { 1 },
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }

    fn lookup_entry(&mut self, parent: u64, name: &str) -> Result<(u64, NodeAttr), i32> {
        let dir = match self.inodes.get(parent) {
            Some(Node::Directory(dir)) => dir.clone(),
            Some(Node::File(_)) => return Err(ENOTDIR),
            None => return Err(ENOENT),
        };
        let node = dir.lookup(name).map_err(|e| failure("lookup", &e))?;
        let node = node.ok_or(ENOENT)?;
        let attr = node.attr();
        Ok((self.inodes.insert(node), attr))
    }

    fn readdir_entries(&mut self, ino: u64) -> Result<Vec<(u64, FileType, String)>, i32> {
        let dir = match self.inodes.get(ino) {
            Some(Node::Directory(dir)) => dir.clone(),
            Some(Node::File(_)) => return Err(ENOTDIR),
            None => return Err(ENOENT),
        };
        let children = dir.read_dir_all().map_err(|e| failure("readdir", &e))?;
        let parent_ino = match dir.prefix().rsplit_once(resolver::SEPARATOR) {
            Some((parent, _)) => self.inodes.dir_inode(parent),
            None => FUSE_ROOT_ID,
        };

        let mut out = Vec::with_capacity(children.len() + 2);
        out.push((ino, FileType::Directory, ".".to_string()));
        out.push((parent_ino, FileType::Directory, "..".to_string()));
        for child in children {
            let entry = match (child.kind, child.id) {
                (EntryKind::File, Some(id)) => {
                    (self.inodes.file_inode(id), FileType::RegularFile, child.name)
                }
                _ => {
                    let path = resolver::join_path(dir.prefix(), &child.name);
                    (self.inodes.dir_inode(&path), FileType::Directory, child.name)
                }
            };
            out.push(entry);
        }
        Ok(out)
    }

    /// Applies a requested size change. Files can only be truncated to zero, which
    /// overwrites the row with empty content.
    fn apply_size(&self, ino: u64, size: Option<u64>) -> Result<NodeAttr, i32> {
        let node = self.inodes.get(ino).ok_or(ENOENT)?;
        match (node, size) {
            (_, None) => {}
            (Node::Directory(_), Some(_)) => return Err(EISDIR),
            (Node::File(file), Some(0)) => {
                file.write(&[], 0).map_err(|e| failure("truncate", &e))?;
            }
            (Node::File(_), Some(_)) => return Err(ENOTSUP),
        }
        Ok(node.attr())
    }
}

fn failure(op: &str, err: &RowFsError) -> i32 {
    warn!(op, error = %err, "filesystem operation failed");
    err.errno()
}

/// Entries at and after `offset`, each paired with the offset that resumes after it.
fn resume_at<T>(entries: Vec<T>, offset: i64) -> impl Iterator<Item = (i64, T)> {
    let skip = usize::try_from(offset).unwrap_or(0);
    entries
        .into_iter()
        .enumerate()
        .skip(skip)
        .map(|(idx, entry)| ((idx + 1) as i64, entry))
}

/// The part of `data` a read of `size` bytes at `offset` returns.
pub fn read_slice(data: &[u8], offset: i64, size: u32) -> &[u8] {
    let start = usize::try_from(offset).unwrap_or(0).min(data.len());
    let end = start.saturating_add(size as usize).min(data.len());
    &data[start..end]
}

impl<S: RowStore> Filesystem for RowFsMount<S> {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(name) = name.to_str() else {
            reply.error(EINVAL);
            return;
        };
        match self.lookup_entry(parent, name) {
            Ok((ino, attr)) => reply.entry(&TTL, &self.file_attr(ino, attr), 0),
            Err(code) => reply.error(code),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        match self.inodes.get(ino).map(Node::attr) {
            Some(attr) => reply.attr(&TTL, &self.file_attr(ino, attr)),
            None => reply.error(ENOENT),
        }
    }

    /// Only size changes have an effect; mode, owner and time changes are accepted and
    /// ignored.
    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        match self.apply_size(ino, size) {
            Ok(attr) => reply.attr(&TTL, &self.file_attr(ino, attr)),
            Err(code) => reply.error(code),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.inodes.get(ino) {
            Some(Node::File(file)) => {
                let flags = if file.open().keep_cache {
                    FOPEN_KEEP_CACHE
                } else {
                    0
                };
                reply.opened(0, flags);
            }
            Some(Node::Directory(_)) => reply.error(EISDIR),
            None => reply.error(ENOENT),
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
        match self.inodes.get(ino) {
            Some(Node::File(file)) => {
                let content = file.read();
                reply.data(read_slice(&content, offset, size));
            }
            Some(Node::Directory(_)) => reply.error(EISDIR),
            None => reply.error(ENOENT),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        match self.inodes.get(ino) {
            Some(Node::File(file)) => match file.write(data, offset) {
                Ok(written) => reply.written(written as u32),
                Err(err) => reply.error(failure("write", &err)),
            },
            Some(Node::Directory(_)) => reply.error(EISDIR),
            None => reply.error(ENOENT),
        }
    }

    fn flush(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _lock_owner: u64,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn fsync(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _datasync: bool,
        reply: ReplyEmpty,
    ) {
        match self.inodes.get(ino) {
            Some(Node::File(file)) => match file.fsync() {
                Ok(()) => reply.ok(),
                Err(err) => reply.error(failure("fsync", &err)),
            },
            Some(Node::Directory(_)) => reply.ok(),
            None => reply.error(ENOENT),
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
        let entries = match self.readdir_entries(ino) {
            Ok(entries) => entries,
            Err(code) => {
                reply.error(code);
                return;
            }
        };
        for (next, (child_ino, kind, name)) in resume_at(entries, offset) {
            if reply.add(child_ino, next, kind, name) {
                break;
            }
        }
        reply.ok();
    }
}

/// Mounts `fs` at `mountpoint` and serves requests until it is unmounted.
pub fn mount<S: RowStore>(fs: RowFs<S>, mountpoint: &Path) -> Result<(), RowFsError> {
    let options = [
        MountOption::FSName("rowfs".to_string()),
        MountOption::Subtype("rowfs".to_string()),
        MountOption::RW,
        MountOption::DefaultPermissions,
    ];
    info!(mountpoint = %mountpoint.display(), "mounting row tree");
    fuser::mount2(RowFsMount::new(fs), mountpoint, &options)
        .map_err(|e| RowFsError::mount(format!("{}: {e}", mountpoint.display())))?;
    debug!(mountpoint = %mountpoint.display(), "unmounted");
    Ok(())
}
