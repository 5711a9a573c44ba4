use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use lightsnap::consts::is_shadow_table;
use lightsnap::engine::flags::table_flag_names;
use lightsnap::stats::{sample, TableSample};
use lightsnap::util::human_size;
use lightsnap::EnvGuard;

use super::util::load_config;

#[derive(Serialize)]
struct InfoDoc<'a> {
    path: String,
    map_size: u64,
    disk_bytes: u64,
    last_txn_id: u64,
    max_readers: u32,
    total_entries: u64,
    total_pages: u64,
    tables: &'a [TableSample],
}

pub fn exec(path: Option<PathBuf>, json: bool) -> Result<()> {
    let cfg = load_config(path);
    let env = EnvGuard::open(&cfg.lmdb_path, &cfg.lmdb_options)?;
    let s = sample(&env, None, false)?;
    let totals = env.stat()?;

    if json {
        let doc = InfoDoc {
            path: cfg.lmdb_path.display().to_string(),
            map_size: s.info.map_size,
            disk_bytes: s.info.disk_bytes,
            last_txn_id: s.info.last_txn_id,
            max_readers: s.info.max_readers,
            total_entries: totals.entries,
            total_pages: totals.pages,
            tables: &s.tables,
        };
        println!("{}", serde_json::to_string(&doc)?);
        return Ok(());
    }

    println!("Env: {}", cfg.lmdb_path.display());
    println!(
        "  map_size    = {} ({} on disk)",
        human_size(s.info.map_size),
        human_size(s.info.disk_bytes)
    );
    println!("  last_txn_id = {}", s.info.last_txn_id);
    println!("  max_readers = {}", s.info.max_readers);
    println!(
        "  entries     = {} ({} pages)",
        totals.entries,
        totals.pages
    );
    println!("Tables ({}):", s.tables.len());
    for t in &s.tables {
        println!(
            "  {:<24} entries={:<8} depth={} pages={} flags=[{}]{}",
            t.name,
            t.entries,
            t.depth,
            t.branch_pages + t.leaf_pages + t.overflow_pages,
            table_flag_names(t.flags).join(","),
            if is_shadow_table(&t.name) { " shadow" } else { "" }
        );
    }
    Ok(())
}
