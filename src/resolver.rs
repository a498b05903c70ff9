//! Path tree resolution over a flat row set.
//!
//! There is no stored tree: every answer is derived from the full paths
//! (`group_id/path`) of the rows handed in. A path that some row's full path equals is a
//! file; a path that is a prefix of some full path is a synthetic directory.

use ahash::AHashSet;
use serde::Serialize;

use crate::record::Record;

pub const SEPARATOR: char = '/';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Identity of the row behind a file entry.
    pub id: Option<i64>,
}

impl DirEntry {
    pub fn file(name: &str, id: i64) -> Self {
        Self {
            name: name.to_string(),
            kind: EntryKind::File,
            id: Some(id),
        }
    }

    pub fn directory(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: EntryKind::Directory,
            id: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    File(Record),
    Directory(String),
    NotFound,
}

pub fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{SEPARATOR}{name}")
    }
}

/// Resolves `name` inside the directory `prefix`. An exact full-path match wins over a
/// directory interpretation; with duplicate full paths the first row in scan order wins.
pub fn lookup(records: &[Record], prefix: &str, name: &str) -> Resolution {
    let query = join_path(prefix, name);
    let mut prefix_exists = false;
    for record in records {
        let full_path = record.full_path();
        if full_path == query {
            return Resolution::File(record.clone());
        }
        if !prefix_exists && full_path.starts_with(&query) {
            prefix_exists = true;
        }
    }
    if prefix_exists {
        Resolution::Directory(query)
    } else {
        Resolution::NotFound
    }
}

/// Immediate children of the directory `prefix`, in scan order.
///
/// Directory names are reported once no matter how many rows extend them. Leaf names
/// are reported once per row. When a name is both a row's leaf and another row's
/// directory prefix it is reported as a file, matching what [`lookup`] returns for it.
/// Empty names are never reported.
pub fn read_dir_all(records: &[Record], prefix: &str) -> Vec<DirEntry> {
    let dir_prefix = format!("{prefix}{SEPARATOR}");
    let mut entries = Vec::new();
    let mut seen_dirs = AHashSet::new();
    let mut leaf_names = AHashSet::new();

    for record in records {
        let full_path = record.full_path();
        let (child, is_leaf) = if prefix.is_empty() {
            (first_segment(&full_path), false)
        } else {
            let Some(rest) = full_path.strip_prefix(&dir_prefix) else {
                continue;
            };
            match rest.split_once(SEPARATOR) {
                Some((child, _)) => (child, false),
                None => (rest, true),
            }
        };
        // NULL or empty paths, trailing and doubled separators.
        if child.is_empty() {
            continue;
        }
        if is_leaf {
            leaf_names.insert(child.to_string());
            entries.push(DirEntry::file(child, record.id));
        } else if seen_dirs.insert(child.to_string()) {
            entries.push(DirEntry::directory(child));
        }
    }

    if !leaf_names.is_empty() {
        entries.retain(|entry| {
            entry.kind == EntryKind::File || !leaf_names.contains(entry.name.as_str())
        });
    }
    entries
}

fn first_segment(path: &str) -> &str {
    path.split(SEPARATOR).next().unwrap_or(path)
}
