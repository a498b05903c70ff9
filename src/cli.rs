use std::{io::Write, path::PathBuf};

use clap::Parser;
use tracing::info;

use crate::{
    config::{AppConfig, resolve_config_path},
    errors::RowFsError,
    logging::init_logging,
    mount::mount,
    node::RowFs,
    resolver::EntryKind,
    store::{RowStore, SqliteRowStore},
};

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "rowfs", version, about = "Mount the rows of a SQLite table as a file tree")]
pub struct Cli {
    /// Directory to mount the row tree on; not needed with --list
    #[arg(required_unless_present = "list")]
    pub mountpoint: Option<PathBuf>,

    /// Configuration document (falls back to the platform config dir, then ~/secure/web6.json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Named database profile to use instead of the default one
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Log level or filter directive, e.g. `debug` or `rowfs=trace`
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Print the resolved tree and exit without mounting
    #[arg(long)]
    pub list: bool,
}

/// Runs the command once the arguments are parsed: load configuration, start logging,
/// open the store, then either list the tree or mount it.
pub fn run(cli: &Cli) -> Result<(), RowFsError> {
    let config_path = resolve_config_path(cli.config.as_deref())?;
    let config = AppConfig::load(&config_path)?;
    init_logging(&config.logging, cli.log_level.as_deref())?;
    info!(config = %config_path.display(), "loaded configuration");

    let profile = config.profile(cli.profile.as_deref())?;
    let store = SqliteRowStore::open(profile)?;
    info!(profile = %profile.label(), table = %store.layout().qualified_table(), "connected");
    let fs = RowFs::new(store);

    if cli.list {
        let stdout = std::io::stdout();
        return print_tree(&fs, &mut stdout.lock());
    }
    let Some(mountpoint) = cli.mountpoint.as_deref() else {
        return Err(RowFsError::invalid_input("a mountpoint is required unless --list is given"));
    };
    mount(fs, mountpoint)
}

/// One line per path: `d <path>` for directories, `f <path>` for files.
pub fn print_tree<S, W>(fs: &RowFs<S>, out: &mut W) -> Result<(), RowFsError>
where
    S: RowStore,
    W: Write,
{
    for (path, kind) in fs.walk()? {
        let marker = match kind {
            EntryKind::Directory => 'd',
            EntryKind::File => 'f',
        };
        writeln!(out, "{marker} {path}")
            .map_err(|e| RowFsError::io(format!("cannot write listing: {e}")))?;
    }
    Ok(())
}
