//! Directory and file handles handed to the transport layer.
//!
//! Directories are nothing but a path prefix plus the shared store; every structural
//! question is answered from a fresh row scan. Files keep a private snapshot of their
//! row's content taken when they were resolved, which only their own writes update.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::{
    errors::RowFsError,
    record::Record,
    resolver::{self, DirEntry, EntryKind, Resolution},
    store::RowStore,
    write::write_content,
};

pub const DIRECTORY_PERM: u16 = 0o755;
pub const FILE_PERM: u16 = 0o666;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeAttr {
    /// 0 means the transport assigns one.
    pub inode: u64,
    pub size: u64,
    pub perm: u16,
    pub kind: EntryKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenResponse {
    pub keep_cache: bool,
}

pub struct RowFs<S> {
    store: Arc<S>,
}

impl<S: RowStore> RowFs<S> {
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn root(&self) -> DirectoryNode<S> {
        DirectoryNode::new(String::new(), Arc::clone(&self.store))
    }

    /// Every path below the root with its kind, in depth-first pre-order with siblings
    /// in scan order.
    pub fn walk(&self) -> Result<Vec<(String, EntryKind)>, RowFsError> {
        let mut out = Vec::new();
        self.walk_dir(&self.root(), &mut out)?;
        Ok(out)
    }

    fn walk_dir(
        &self,
        dir: &DirectoryNode<S>,
        out: &mut Vec<(String, EntryKind)>,
    ) -> Result<(), RowFsError> {
        for entry in dir.read_dir_all()? {
            let path = resolver::join_path(dir.prefix(), &entry.name);
            out.push((path.clone(), entry.kind));
            if entry.kind == EntryKind::Directory {
                self.walk_dir(&DirectoryNode::new(path, Arc::clone(&self.store)), out)?;
            }
        }
        Ok(())
    }
}

pub enum Node<S> {
    File(FileNode<S>),
    Directory(DirectoryNode<S>),
}

impl<S: RowStore> Node<S> {
    pub fn attr(&self) -> NodeAttr {
        match self {
            Node::File(file) => file.attr(),
            Node::Directory(dir) => dir.attr(),
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Node::File(_) => EntryKind::File,
            Node::Directory(_) => EntryKind::Directory,
        }
    }
}

pub struct DirectoryNode<S> {
    prefix: String,
    store: Arc<S>,
}

impl<S> Clone for DirectoryNode<S> {
    fn clone(&self) -> Self {
        Self {
            prefix: self.prefix.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RowStore> DirectoryNode<S> {
    fn new(prefix: String, store: Arc<S>) -> Self {
        Self { prefix, store }
    }

    /// Empty for the root.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn attr(&self) -> NodeAttr {
        NodeAttr {
            inode: 0,
            size: 0,
            perm: DIRECTORY_PERM,
            kind: EntryKind::Directory,
        }
    }

    /// `Ok(None)` when nothing lives at `name`; store failures are errors.
    pub fn lookup(&self, name: &str) -> Result<Option<Node<S>>, RowFsError> {
        let records = self.store.fetch_all()?;
        let node = match resolver::lookup(&records, &self.prefix, name) {
            Resolution::File(record) => Some(Node::File(FileNode::new(
                record,
                Arc::clone(&self.store),
            ))),
            Resolution::Directory(path) => Some(Node::Directory(DirectoryNode::new(
                path,
                Arc::clone(&self.store),
            ))),
            Resolution::NotFound => None,
        };
        debug!(
            prefix = %self.prefix,
            name,
            found = ?node.as_ref().map(Node::kind),
            "lookup"
        );
        Ok(node)
    }

    pub fn read_dir_all(&self) -> Result<Vec<DirEntry>, RowFsError> {
        let records = self.store.fetch_all()?;
        let entries = resolver::read_dir_all(&records, &self.prefix);
        debug!(prefix = %self.prefix, entries = entries.len(), "read dir");
        Ok(entries)
    }
}

pub struct FileNode<S> {
    id: i64,
    full_path: String,
    content: RwLock<Vec<u8>>,
    store: Arc<S>,
}

impl<S: RowStore> FileNode<S> {
    fn new(mut record: Record, store: Arc<S>) -> Self {
        Self {
            id: record.id,
            full_path: record.full_path(),
            content: RwLock::new(record.content.take().unwrap_or_default()),
            store,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// Size is the character count of the snapshot, not its byte length.
    pub fn attr(&self) -> NodeAttr {
        let size = String::from_utf8_lossy(&self.content.read()).chars().count();
        NodeAttr {
            inode: u64::try_from(self.id).unwrap_or(0),
            size: size as u64,
            perm: FILE_PERM,
            kind: EntryKind::File,
        }
    }

    pub fn open(&self) -> OpenResponse {
        OpenResponse { keep_cache: true }
    }

    /// The snapshot taken at resolution time plus this node's own writes.
    pub fn read(&self) -> Vec<u8> {
        self.content.read().clone()
    }

    /// Persists the write, then adopts the persisted content as the new snapshot.
    /// A failed write leaves the snapshot untouched.
    pub fn write(&self, data: &[u8], offset: i64) -> Result<usize, RowFsError> {
        let content = write_content(self.store.as_ref(), self.id, data, offset)?;
        *self.content.write() = content;
        Ok(data.len())
    }

    /// Writes are persisted synchronously, so there is nothing to flush.
    pub fn fsync(&self) -> Result<(), RowFsError> {
        Ok(())
    }
}
