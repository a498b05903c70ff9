//! Row store gateway. Every call goes to the database; nothing is cached here, so answers
//! always reflect the latest state committed on the shared connection.

use std::{path::Path, sync::Arc};

use parking_lot::Mutex;
use rusqlite::{
    Connection, OpenFlags, OptionalExtension, ToSql, params,
    types::{ToSqlOutput, ValueRef},
};
use tracing::debug;

use crate::{
    config::DatabaseProfile,
    errors::RowFsError,
    record::{Record, content_from_row, row_to_record},
    schema::{TableLayout, ensure_schema},
};

pub trait RowStore {
    /// Full current row set, in table scan order.
    fn fetch_all(&self) -> Result<Vec<Record>, RowFsError>;
    /// Content of a single row; `Ok(None)` when the column is NULL.
    fn fetch_content(&self, id: i64) -> Result<Option<Vec<u8>>, RowFsError>;
    /// Replaces the content column of a single row.
    fn update_content(&self, id: i64, content: &[u8]) -> Result<(), RowFsError>;
}

pub struct SqliteRowStore {
    conn: Mutex<Connection>,
    layout: TableLayout,
}

impl SqliteRowStore {
    /// Opens the database a configuration profile points at. The table must already exist.
    pub fn open(profile: &DatabaseProfile) -> Result<Self, RowFsError> {
        let layout = profile.table_layout()?;
        let target = profile.connection_string();
        debug!(
            uri = %redact(&target, &profile.password),
            table = %layout.qualified_table(),
            "opening row store"
        );
        let conn = Connection::open_with_flags(
            &target,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| RowFsError::connection(format!("{}: {e}", profile.label())))?;
        let store = Self::from_connection(conn, layout);
        store.verify_table()?;
        Ok(store)
    }

    /// Opens (creating if needed) a database file and its row table.
    pub fn create<P: AsRef<Path>>(path: P, layout: TableLayout) -> Result<Self, RowFsError> {
        let conn =
            Connection::open(path).map_err(|e| RowFsError::connection(e.to_string()))?;
        ensure_schema(&conn, &layout)?;
        Ok(Self::from_connection(conn, layout))
    }

    pub fn in_memory() -> Result<Self, RowFsError> {
        Self::in_memory_with_layout(TableLayout::default())
    }

    pub fn in_memory_with_layout(layout: TableLayout) -> Result<Self, RowFsError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| RowFsError::connection(e.to_string()))?;
        ensure_schema(&conn, &layout)?;
        Ok(Self::from_connection(conn, layout))
    }

    /// Provisioning helper for seeding a table; returns the stored identity. An `id` of 0
    /// lets SQLite assign one.
    pub fn insert_record(&self, record: &Record) -> Result<i64, RowFsError> {
        let conn = self.conn.lock();
        conn.execute(
            &self.layout.insert_sql(),
            params![
                (record.id > 0).then_some(record.id),
                record.group_id,
                record.type_id,
                record.name.as_deref(),
                record.path.as_deref(),
                record.info.as_deref(),
                record.content.as_deref().map(TextBytes),
                record.metadata.as_deref(),
            ],
        )
        .map_err(|e| RowFsError::query(e.to_string()))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    fn verify_table(&self) -> Result<(), RowFsError> {
        let conn = self.conn.lock();
        conn.prepare(&self.layout.select_all_sql())
            .map(|_| ())
            .map_err(|e| {
                RowFsError::connection(format!(
                    "table {} is not readable: {e}",
                    self.layout.qualified_table()
                ))
            })
    }

    fn from_connection(conn: Connection, layout: TableLayout) -> Self {
        Self {
            conn: Mutex::new(conn),
            layout,
        }
    }
}

impl RowStore for SqliteRowStore {
    fn fetch_all(&self) -> Result<Vec<Record>, RowFsError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(&self.layout.select_all_sql())
            .map_err(|e| RowFsError::query(e.to_string()))?;
        let rows = stmt
            .query_map([], row_to_record)
            .map_err(|e| RowFsError::query(e.to_string()))?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| RowFsError::query(e.to_string()))?);
        }
        debug!(rows = records.len(), "fetched row set");
        Ok(records)
    }

    fn fetch_content(&self, id: i64) -> Result<Option<Vec<u8>>, RowFsError> {
        let conn = self.conn.lock();
        let content = conn
            .query_row(&self.layout.select_content_sql(), params![id], |row| {
                content_from_row(row, 0)
            })
            .optional()
            .map_err(|e| RowFsError::query(e.to_string()))?;
        content.ok_or_else(|| RowFsError::not_found(format!("row {id}")))
    }

    fn update_content(&self, id: i64, content: &[u8]) -> Result<(), RowFsError> {
        let conn = self.conn.lock();
        let affected = conn
            .execute(
                &self.layout.update_content_sql(),
                params![id, TextBytes(content)],
            )
            .map_err(|e| RowFsError::query(e.to_string()))?;
        if affected == 0 {
            return Err(RowFsError::not_found(format!("row {id}")));
        }
        debug!(id, bytes = content.len(), "updated row content");
        Ok(())
    }
}

impl<'a, B> RowStore for &'a B
where
    B: RowStore + ?Sized,
{
    fn fetch_all(&self) -> Result<Vec<Record>, RowFsError> {
        (*self).fetch_all()
    }

    fn fetch_content(&self, id: i64) -> Result<Option<Vec<u8>>, RowFsError> {
        (*self).fetch_content(id)
    }

    fn update_content(&self, id: i64, content: &[u8]) -> Result<(), RowFsError> {
        (*self).update_content(id, content)
    }
}

impl<B> RowStore for Arc<B>
where
    B: RowStore + ?Sized,
{
    fn fetch_all(&self) -> Result<Vec<Record>, RowFsError> {
        self.as_ref().fetch_all()
    }

    fn fetch_content(&self, id: i64) -> Result<Option<Vec<u8>>, RowFsError> {
        self.as_ref().fetch_content(id)
    }

    fn update_content(&self, id: i64, content: &[u8]) -> Result<(), RowFsError> {
        self.as_ref().update_content(id, content)
    }
}

/// Binds raw bytes as a TEXT value so content stays a text column even when a write
/// ends in the middle of a multi-byte character.
struct TextBytes<'a>(&'a [u8]);

impl ToSql for TextBytes<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(ValueRef::Text(self.0)))
    }
}

fn redact(target: &str, password: &str) -> String {
    if password.is_empty() {
        target.to_string()
    } else {
        target.replace(password, "***")
    }
}
