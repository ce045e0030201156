use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tcy", about = concat!("[/] task-cycle v", env!("CARGO_PKG_VERSION"), " - cycle task status marks"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Settings file (.json plugin data or .toml)
    #[arg(short = 's', long, global = true)]
    pub settings: Option<PathBuf>,

    /// Behave as if a Tasks-compatible plugin were loaded
    #[arg(long = "tasks-plugin", global = true)]
    pub tasks_plugin: bool,

    /// Log filter, e.g. `debug` or `task_cycle::ops=trace` (default: $TCY_LOG, then warn)
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Log format: compact, pretty or json
    #[arg(long = "log-format", global = true, default_value = "compact")]
    pub log_format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a JSON transaction through status cycling
    Filter(FilterArgs),
    /// Advance the task on a line to its next state
    Cycle(CycleArgs),
    /// Set the state of the task on a line
    Set(SetArgs),
    /// Show the resolved status cycle
    Config,
}

#[derive(Args)]
pub struct FilterArgs {
    /// Transaction file (`-` for stdin)
    pub transaction: PathBuf,
}

#[derive(Args)]
pub struct CycleArgs {
    /// Markdown file
    pub file: PathBuf,
    /// 1-based line number of the task
    #[arg(short = 'l', long)]
    pub line: usize,
    /// Jump to the last state (or back to the first) instead of advancing
    #[arg(long)]
    pub jump: bool,
    /// Write the result back to the file instead of printing it
    #[arg(short = 'i', long = "in-place")]
    pub in_place: bool,
}

#[derive(Args)]
pub struct SetArgs {
    /// Markdown file
    pub file: PathBuf,
    /// 1-based line number of the task
    #[arg(short = 'l', long)]
    pub line: usize,
    /// State name from the cycle
    #[arg(long)]
    pub state: String,
    /// Write the result back to the file instead of printing it
    #[arg(short = 'i', long = "in-place")]
    pub in_place: bool,
}
