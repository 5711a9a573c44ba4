use anyhow::{Context, Result};
use std::path::PathBuf;

use lightsnap::engine::flags::{TABLE_CREATE, TABLE_DUP_SORT};
use lightsnap::snapshot::encode_value;
use lightsnap::util::{display_ascii, now_nanos};
use lightsnap::EnvGuard;

use super::util::{decode_value_arg, load_config};

pub fn exec(
    path: Option<PathBuf>,
    table: String,
    dup_sort: bool,
    key: String,
    value: String,
    ts: Option<u64>,
) -> Result<()> {
    let cfg = load_config(path);
    let payload = decode_value_arg(&value)?;
    let ts = ts.unwrap_or_else(now_nanos);

    let opts = cfg.lmdb_options.clone().with_create(true);
    let env = EnvGuard::open(&cfg.lmdb_path, &opts)?;

    let mut flags = TABLE_CREATE;
    if dup_sort {
        flags |= TABLE_DUP_SORT;
    }
    let mut txn = env.begin_rw()?;
    let dbi = txn
        .create_table(&table, flags)
        .with_context(|| format!("open table {}", table))?;
    txn.put(&dbi, key.as_bytes(), &encode_value(ts, &payload))?;
    let txn_id = txn.commit()?;

    println!(
        "OK put: table={} key='{}' value={} B ts={} txn_id={}",
        table,
        display_ascii(key.as_bytes()),
        payload.len(),
        ts,
        txn_id
    );
    Ok(())
}
