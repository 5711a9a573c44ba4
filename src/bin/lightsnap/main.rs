use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};

mod cli;
mod util;
mod cmd_put;
mod cmd_dump;
mod cmd_info;
mod cmd_stats;

fn init_logger() {
    // RUST_LOG wins; default level is info
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Put { path, table, dup_sort, key, value, ts } =>
            cmd_put::exec(path, table, dup_sort, key, value, ts),

        cli::Cmd::Dump { path, tables, raw, dupsort_hack, instance, generation, pretty } =>
            cmd_dump::exec(cmd_dump::DumpArgs {
                path,
                tables,
                raw,
                dupsort_hack,
                instance,
                generation,
                pretty,
            }),

        cli::Cmd::Info { path, json } =>
            cmd_info::exec(path, json),

        cli::Cmd::Stats { path, interval, duration, smaps } =>
            cmd_stats::exec(path, interval, duration, smaps),
    }
}
