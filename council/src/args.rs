use std::path::PathBuf;

use clap::Parser;

/// Runs one council deliberation against a configured board and prints the
/// resulting event stream.
#[derive(Debug, Parser)]
#[command(name = "council", version, about)]
pub struct Args {
    /// Path to the council configuration file.
    #[arg(long, short = 'c', env = "COUNCIL_CONFIG", default_value = "council.toml")]
    pub config: PathBuf,

    /// Id of the board to deliberate against, as configured under `[boards.*]`.
    #[arg(long, short = 'b')]
    pub board: String,

    /// The user message to submit. Read from stdin if omitted.
    pub message: Option<String>,

    /// Log filter, e.g. "info" or "engine=debug,registry=debug".
    #[arg(long, env = "COUNCIL_LOG", default_value = "info")]
    pub log_filter: String,
}
