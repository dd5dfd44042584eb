use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "herd", version, about = "Start local services, wait for health, stop them together")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch every service, wait until all are healthy, and hold until Ctrl+C
    Up {
        /// Directory that relative service directories resolve against
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Path to config file (overrides default search)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seconds between health-check attempts
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        probe_interval: Option<u64>,

        /// Seconds a service gets to exit after SIGTERM before SIGKILL
        #[arg(long)]
        grace: Option<u64>,

        /// Startup timeout in seconds, applied to every service
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,
    },
    /// Print the service registry in startup order
    List {
        /// Directory that relative service directories resolve against
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Path to config file (overrides default search)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}
