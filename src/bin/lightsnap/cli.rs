use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Snapshot reader for lightsnap environments
#[derive(Parser, Debug)]
#[command(name = "lightsnap", version, about = "lightsnap CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Store a timestamped value (creates the environment and table if needed)
    Put {
        /// Environment path (default: LS_LMDB_PATH)
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(long)]
        table: String,
        /// Create the table as dup-sort
        #[arg(long)]
        dup_sort: bool,
        #[arg(long)]
        key: String,
        /// Literal string, "hex:<bytes>", "@<file>" or "-" for stdin
        #[arg(long)]
        value: String,
        /// Timestamp in nanoseconds (default: now)
        #[arg(long)]
        ts: Option<u64>,
    },
    /// Extract tables and print them as one JSON document
    Dump {
        #[arg(long)]
        path: Option<PathBuf>,
        /// Tables to read (default: every table outside the _sync prefix)
        #[arg(long = "table")]
        tables: Vec<String>,
        /// Keep stored values as is, without splitting the timestamp header
        #[arg(long)]
        raw: bool,
        /// Accept dup-sort tables
        #[arg(long)]
        dupsort_hack: bool,
        /// Instance name (default: LS_INSTANCE, then host name)
        #[arg(long)]
        instance: Option<String>,
        #[arg(long, default_value_t = 0)]
        generation: u64,
        #[arg(long)]
        pretty: bool,
    },
    /// Environment info and per-table statistics
    Info {
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Run the stats logger for a while, then stop it
    Stats {
        #[arg(long)]
        path: Option<PathBuf>,
        /// Sampling interval, e.g. "500ms", "5s" (default: LS_LMDB_LOG_STATS_INTERVAL)
        #[arg(long)]
        interval: Option<String>,
        /// How long to run, e.g. "10s"
        #[arg(long, default_value = "10s")]
        duration: String,
        /// Include /proc/self/smaps_rollup figures
        #[arg(long)]
        smaps: bool,
    },
}
