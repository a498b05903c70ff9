use rusqlite::Connection;

use crate::errors::RowFsError;

pub const DEFAULT_TABLE: &str = "web_widget";
pub const DEFAULT_ID_COLUMN: &str = "_id";
pub const DEFAULT_CONTENT_COLUMN: &str = "html";

/// Where the rows live. Names are spliced into SQL, so they are validated as plain
/// identifiers on construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableLayout {
    schema: Option<String>,
    table: String,
    id_column: String,
    content_column: String,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            schema: None,
            table: DEFAULT_TABLE.to_string(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            content_column: DEFAULT_CONTENT_COLUMN.to_string(),
        }
    }
}

impl TableLayout {
    pub fn new(
        schema: Option<&str>,
        table: &str,
        id_column: &str,
        content_column: &str,
    ) -> Result<Self, RowFsError> {
        let schema = match schema.map(str::trim) {
            Some(s) if !s.is_empty() => Some(validate_identifier(s)?.to_string()),
            _ => None,
        };
        Ok(Self {
            schema,
            table: validate_identifier(table)?.to_string(),
            id_column: validate_identifier(id_column)?.to_string(),
            content_column: validate_identifier(content_column)?.to_string(),
        })
    }

    pub fn qualified_table(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.table),
            None => self.table.clone(),
        }
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub fn content_column(&self) -> &str {
        &self.content_column
    }

    pub fn select_all_sql(&self) -> String {
        format!("SELECT * FROM {}", self.qualified_table())
    }

    pub fn select_content_sql(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {}=?1",
            self.content_column,
            self.qualified_table(),
            self.id_column
        )
    }

    pub fn update_content_sql(&self) -> String {
        format!(
            "UPDATE {} SET {}=?2 WHERE {}=?1",
            self.qualified_table(),
            self.content_column,
            self.id_column
        )
    }

    pub fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            self.qualified_table()
        )
    }
}

pub fn validate_identifier(name: &str) -> Result<&str, RowFsError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(RowFsError::invalid_input(format!(
            "{name:?} is not a valid SQL identifier"
        )));
    }
    Ok(name)
}

/// Creates the row table when it does not exist yet. Column order matches what
/// [`crate::record::row_to_record`] expects from `SELECT *`.
pub fn ensure_schema(conn: &Connection, layout: &TableLayout) -> Result<(), RowFsError> {
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            {id}      INTEGER PRIMARY KEY,
            group_id  INTEGER,
            type_id   INTEGER,
            name      TEXT,
            path      TEXT,
            info      TEXT,
            {content} TEXT,
            metadata  TEXT
        );
        "#,
        table = layout.qualified_table(),
        id = layout.id_column,
        content = layout.content_column,
    ))
    .map_err(|e| RowFsError::query(e.to_string()))?;
    Ok(())
}
