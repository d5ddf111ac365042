use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use humantime::parse_duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Forward Dynatrace problems and webhook events as JSON lines", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the poll delay (e.g. "90s").
    #[arg(long, value_parser = parse_duration)]
    pub delay: Option<Duration>,

    /// Run a single poll cycle, print what was forwarded, then exit.
    #[arg(long, action = ArgAction::SetTrue)]
    pub once: bool,

    /// Allow plain-HTTP Dynatrace API hosts.
    #[arg(long, action = ArgAction::SetTrue)]
    pub insecure: bool,

    /// Emit logs as JSON (`--features json-logs`).
    #[arg(long, action = ArgAction::SetTrue)]
    pub json_logs: bool,

    /// Explicit log filter (e.g. "dt_ingest=debug").
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
