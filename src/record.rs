use rusqlite::types::ValueRef;
use serde::{Deserialize, Serialize};

/// One row of the backing table. Only `id` is guaranteed to be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub id: i64,
    pub group_id: Option<i64>,
    pub type_id: Option<i64>,
    pub name: Option<String>,
    pub path: Option<String>,
    pub info: Option<String>,
    pub content: Option<Vec<u8>>,
    pub metadata: Option<String>,
}

impl Record {
    pub fn new(id: i64, group_id: i64, path: &str) -> Self {
        Self {
            id,
            group_id: Some(group_id),
            path: Some(path.to_string()),
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// `group_id/path`; NULL group renders as 0 and NULL path as "".
    pub fn full_path(&self) -> String {
        format!(
            "{}/{}",
            self.group_id.unwrap_or(0),
            self.path.as_deref().unwrap_or("")
        )
    }

    pub fn content_bytes(&self) -> &[u8] {
        self.content.as_deref().unwrap_or(&[])
    }
}

/// Maps a `SELECT *` row positionally: id, group, type, name, path, info, content, metadata.
pub fn row_to_record(row: &rusqlite::Row<'_>) -> Result<Record, rusqlite::Error> {
    Ok(Record {
        id: row.get(0)?,
        group_id: row.get(1)?,
        type_id: row.get(2)?,
        name: row.get(3)?,
        path: row.get(4)?,
        info: row.get(5)?,
        content: content_from_row(row, 6)?,
        metadata: row.get(7)?,
    })
}

/// Content columns may hold TEXT or BLOB values; both are read back as raw bytes.
pub fn content_from_row(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> Result<Option<Vec<u8>>, rusqlite::Error> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Ok(Some(bytes.to_vec())),
        ValueRef::Integer(v) => Ok(Some(v.to_string().into_bytes())),
        ValueRef::Real(v) => Ok(Some(v.to_string().into_bytes())),
    }
}
