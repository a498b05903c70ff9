//! Rows of a SQLite table exposed as a file tree.
//!
//! Each row's `group_id/path` places it in a virtual hierarchy; directories exist only
//! as shared prefixes of those paths and each row's content column is a readable,
//! writable file. See [`resolver`] for how the tree is derived and [`write`] for how
//! file writes map onto row content.

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod mount;
pub mod node;
pub mod record;
pub mod resolver;
pub mod schema;
pub mod store;
pub mod write;

pub use crate::config::{AppConfig, DatabaseProfile};
pub use crate::errors::RowFsError;
pub use crate::node::{DirectoryNode, FileNode, Node, NodeAttr, OpenResponse, RowFs};
pub use crate::record::Record;
pub use crate::resolver::{DirEntry, EntryKind, Resolution};
pub use crate::store::{RowStore, SqliteRowStore};
