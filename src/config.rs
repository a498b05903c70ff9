//! Startup configuration.
//!
//! A single JSON document names a default database profile, any number of named
//! profiles, and optional logging settings. It is read once before the filesystem is
//! built and then passed down by value.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    errors::RowFsError,
    logging::LoggingConfig,
    schema::{DEFAULT_CONTENT_COLUMN, DEFAULT_ID_COLUMN, DEFAULT_TABLE, TableLayout},
};

pub const CONFIG_FILE_NAME: &str = "rowfs.json";
/// Searched under the home directory when no other document is found.
pub const LEGACY_CONFIG_PATH: &str = "secure/web6.json";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub default_database: DatabaseProfile,
    #[serde(default)]
    pub databases: HashMap<String, DatabaseProfile>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub connect_template: String,
    #[serde(default, rename = "connect_opts")]
    pub connect_options: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    #[serde(default = "default_content_column")]
    pub content_column: String,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_id_column() -> String {
    DEFAULT_ID_COLUMN.to_string()
}

fn default_content_column() -> String {
    DEFAULT_CONTENT_COLUMN.to_string()
}

impl Default for DatabaseProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            database: String::new(),
            schema: String::new(),
            user: String::new(),
            password: String::new(),
            host: String::new(),
            connect_template: String::new(),
            connect_options: String::new(),
            table: default_table(),
            id_column: default_id_column(),
            content_column: default_content_column(),
        }
    }
}

impl DatabaseProfile {
    /// Renders `connect_template`, or just the database when no template is set.
    pub fn connection_string(&self) -> String {
        let template = if self.connect_template.trim().is_empty() {
            "{database}"
        } else {
            self.connect_template.as_str()
        };
        template
            .replace("{name}", &self.name)
            .replace("{database}", &self.database)
            .replace("{schema}", &self.schema)
            .replace("{user}", &self.user)
            .replace("{password}", &self.password)
            .replace("{host}", &self.host)
            .replace("{connect_opts}", &self.connect_options)
    }

    pub fn table_layout(&self) -> Result<TableLayout, RowFsError> {
        TableLayout::new(
            Some(self.schema.as_str()),
            &self.table,
            &self.id_column,
            &self.content_column,
        )
        .map_err(|e| RowFsError::config(format!("profile {}: {e}", self.label())))
    }

    /// Human readable name for messages; never includes credentials.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.database.clone()
        } else {
            self.name.clone()
        }
    }
}

impl AppConfig {
    pub fn from_json(text: &str) -> Result<Self, RowFsError> {
        serde_json::from_str(text)
            .map_err(|e| RowFsError::config(format!("cannot parse config: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, RowFsError> {
        let text = fs::read_to_string(path).map_err(|e| {
            RowFsError::config(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
            .map_err(|e| RowFsError::config(format!("{}: {e}", path.display())))
    }

    /// `databases[name]` when a name is given, the default profile otherwise.
    pub fn profile(&self, name: Option<&str>) -> Result<&DatabaseProfile, RowFsError> {
        match name {
            None => Ok(&self.default_database),
            Some(name) => self
                .databases
                .get(name)
                .ok_or_else(|| RowFsError::config(format!("no database profile named {name}"))),
        }
    }
}

/// Picks the configuration document: the explicit path when it exists, then the
/// platform config directory, then the legacy file under the home directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, RowFsError> {
    let project_file = directories::ProjectDirs::from("", "", "rowfs")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME));
    let legacy_file =
        directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(LEGACY_CONFIG_PATH));
    first_existing(explicit, &[project_file, legacy_file])
}

fn first_existing(
    explicit: Option<&Path>,
    fallbacks: &[Option<PathBuf>],
) -> Result<PathBuf, RowFsError> {
    let mut tried = Vec::new();
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        tried.push(path.display().to_string());
    }
    for path in fallbacks.iter().flatten() {
        if path.is_file() {
            return Ok(path.clone());
        }
        tried.push(path.display().to_string());
    }
    Err(RowFsError::config(format!(
        "no configuration found (tried {})",
        tried.join(", ")
    )))
}
