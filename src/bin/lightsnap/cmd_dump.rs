use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use lightsnap::metrics;
use lightsnap::{generation_id, read_tables, syncable_tables, EnvGuard, HostIdentity, TableSnapshot};

use super::util::{load_config, to_hex};

pub struct DumpArgs {
    pub path: Option<PathBuf>,
    pub tables: Vec<String>,
    pub raw: bool,
    pub dupsort_hack: bool,
    pub instance: Option<String>,
    pub generation: u64,
    pub pretty: bool,
}

#[derive(Serialize)]
struct DumpDoc {
    instance_id: String,
    generation_id: String,
    raw: bool,
    tables: Vec<DumpTable>,
}

#[derive(Serialize)]
struct DumpTable {
    name: String,
    flags: u64,
    entries: Vec<DumpEntry>,
}

#[derive(Serialize)]
struct DumpEntry {
    key: String,
    value: String,
    timestamp_nano: u64,
}

impl From<TableSnapshot> for DumpTable {
    fn from(t: TableSnapshot) -> Self {
        Self {
            name: t.name,
            flags: t.flags,
            entries: t
                .entries
                .into_iter()
                .map(|kv| DumpEntry {
                    key: to_hex(&kv.key),
                    value: to_hex(&kv.value),
                    timestamp_nano: kv.timestamp_nano,
                })
                .collect(),
        }
    }
}

pub fn exec(args: DumpArgs) -> Result<()> {
    let mut cfg = load_config(args.path);
    if let Some(name) = args.instance {
        cfg = cfg.with_instance(name);
    }
    if args.dupsort_hack {
        cfg = cfg.with_dupsort_hack(true);
    }

    let host = HostIdentity::resolve();
    let env = EnvGuard::open(&cfg.lmdb_path, &cfg.lmdb_options)?;
    let txn = env.begin_ro()?;

    let names = if args.tables.is_empty() {
        syncable_tables(&txn)?
    } else {
        args.tables
    };
    let tables = read_tables(&txn, names.as_slice(), args.raw, &cfg.extract_options())
        .context("extract tables")?;
    let m = metrics::snapshot();
    info!(
        "extracted tables={} entries={} avg_per_table={:.1}",
        m.tables_extracted,
        m.entries_extracted,
        m.avg_entries_per_table()
    );

    let doc = DumpDoc {
        instance_id: host.instance_id(&cfg.instance),
        generation_id: generation_id(args.generation),
        raw: args.raw,
        tables: tables.into_iter().map(DumpTable::from).collect(),
    };
    drop(txn);

    let out = if args.pretty {
        serde_json::to_string_pretty(&doc)?
    } else {
        serde_json::to_string(&doc)?
    };
    println!("{}", out);
    env.close();
    Ok(())
}
