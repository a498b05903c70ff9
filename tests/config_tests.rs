use rowfs::{AppConfig, DatabaseProfile, RowFsError, config::resolve_config_path};

const DOCUMENT: &str = r#"{
    "default_database": {
        "name": "web6",
        "database": "/srv/web6.db",
        "user": "web",
        "password": "s3cret",
        "host": "localhost",
        "connect_template": "file:{database}?{connect_opts}",
        "connect_opts": "mode=rw"
    },
    "databases": {
        "staging": {
            "database": "/srv/staging.db",
            "schema": "main",
            "table": "pages",
            "id_column": "page_id",
            "content_column": "body"
        }
    },
    "logging": { "level": "debug", "format": "json" }
}"#;

#[test]
fn test_parse_full_document() {
    let config = AppConfig::from_json(DOCUMENT).expect("config");
    assert_eq!(config.default_database.name, "web6");
    assert_eq!(config.default_database.connect_options, "mode=rw");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
    assert!(config.logging.enabled);
    assert!(config.databases.contains_key("staging"));
}

#[test]
fn test_missing_fields_take_defaults() {
    let config = AppConfig::from_json(r#"{"default_database": {"database": "rows.db"}}"#)
        .expect("config");
    let profile = &config.default_database;
    assert_eq!(profile.table, "web_widget");
    assert_eq!(profile.id_column, "_id");
    assert_eq!(profile.content_column, "html");
    assert_eq!(profile.label(), "rows.db");
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_empty_document_is_valid() {
    let config = AppConfig::from_json("{}").expect("config");
    assert_eq!(config.default_database, DatabaseProfile::default());
    assert!(config.databases.is_empty());
}

#[test]
fn test_malformed_document_is_config_error() {
    let err = AppConfig::from_json("{\"default_database\": ").unwrap_err();
    assert!(matches!(err, RowFsError::ConfigError(_)));
}

#[test]
fn test_profile_selection() {
    let config = AppConfig::from_json(DOCUMENT).expect("config");
    assert_eq!(config.profile(None).expect("default").name, "web6");
    assert_eq!(
        config.profile(Some("staging")).expect("staging").database,
        "/srv/staging.db"
    );
    let err = config.profile(Some("prod")).unwrap_err();
    assert!(matches!(err, RowFsError::ConfigError(_)));
}

#[test]
fn test_connection_string_renders_template() {
    let config = AppConfig::from_json(DOCUMENT).expect("config");
    assert_eq!(
        config.default_database.connection_string(),
        "file:/srv/web6.db?mode=rw"
    );
}

#[test]
fn test_connection_string_without_template_is_database() {
    let profile = DatabaseProfile {
        database: "rows.db".into(),
        ..DatabaseProfile::default()
    };
    assert_eq!(profile.connection_string(), "rows.db");
}

#[test]
fn test_table_layout_from_profile() {
    let config = AppConfig::from_json(DOCUMENT).expect("config");
    let layout = config
        .profile(Some("staging"))
        .expect("staging")
        .table_layout()
        .expect("layout");
    assert_eq!(layout.qualified_table(), "main.pages");
    assert_eq!(layout.id_column(), "page_id");
    assert_eq!(layout.content_column(), "body");
}

#[test]
fn test_invalid_identifier_is_config_error() {
    let profile = DatabaseProfile {
        table: "web_widget; DROP TABLE x".into(),
        ..DatabaseProfile::default()
    };
    let err = profile.table_layout().unwrap_err();
    assert!(matches!(err, RowFsError::ConfigError(_)));
}

#[test]
fn test_load_reads_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("rowfs.json");
    std::fs::write(&path, DOCUMENT).expect("write");
    let config = AppConfig::load(&path).expect("load");
    assert_eq!(config.default_database.user, "web");
}

#[test]
fn test_load_missing_file_is_config_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = AppConfig::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, RowFsError::ConfigError(_)));
}

#[test]
fn test_resolve_prefers_existing_explicit_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("custom.json");
    std::fs::write(&path, "{}").expect("write");
    assert_eq!(resolve_config_path(Some(&path)).expect("resolve"), path);
}
