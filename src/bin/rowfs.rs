use std::process;

use clap::Parser;
use rowfs::cli::{Cli, run};
use tracing::error;

fn main() {
    // Missing or malformed arguments print usage and exit with status 2.
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        error!(error = %err, "rowfs failed");
        eprintln!("error: {err}");
        process::exit(1);
    }
}
