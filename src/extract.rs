//! extract: turn a live table into a `TableSnapshot`.
//!
//! One pass over the table inside the caller's read transaction:
//! - open the table, size the output from its entry count, read its flags;
//! - refuse dup-sort tables unless `dupsort_hack` is set;
//! - walk the cursor once, rejecting a key equal to the one just before it
//!   (non-dup-sort only) and splitting the 8-byte timestamp header off each
//!   value (unless raw).
//!
//! The duplicate check only looks at the immediately preceding key. Keys that
//! are out of lexicographic order are legal (reverse and integer tables).
//! Nothing is written and nothing is retried; any failure aborts the table.

use log::debug;

use crate::consts::is_sync_table;
use crate::engine::flags::is_dup_sort;
use crate::engine::ReadView;
use crate::error::SyncError;
use crate::metrics;
use crate::snapshot::{decode_value, Kv, TableSnapshot};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Accept dup-sort tables and read every (key, value) pair.
    pub dupsort_hack: bool,
}

impl ExtractOptions {
    pub fn with_dupsort_hack(mut self, on: bool) -> Self {
        self.dupsort_hack = on;
        self
    }
}

/// Read every entry of `dbi_name` into a fresh snapshot.
pub fn read_table<T: ReadView + ?Sized>(
    txn: &T,
    dbi_name: &str,
    raw_values: bool,
    opts: &ExtractOptions,
) -> Result<TableSnapshot, SyncError> {
    let res = read_table_inner(txn, dbi_name, raw_values, opts);
    match &res {
        Ok(t) => metrics::record_table_extracted(t.len()),
        Err(_) => metrics::record_extract_failure(),
    }
    res
}

fn read_table_inner<T: ReadView + ?Sized>(
    txn: &T,
    dbi_name: &str,
    raw_values: bool,
    opts: &ExtractOptions,
) -> Result<TableSnapshot, SyncError> {
    let dbi = txn
        .open_table(dbi_name)
        .map_err(|source| SyncError::TableOpen {
            dbi_name: dbi_name.to_string(),
            source,
        })?;

    let stat = txn.stat(&dbi)?;
    let flags = txn.flags(&dbi)?;
    let dup_sort = is_dup_sort(flags);
    if dup_sort && !opts.dupsort_hack {
        return Err(SyncError::MultiValueUnsupported {
            dbi_name: dbi_name.to_string(),
        });
    }

    let mut out = TableSnapshot::with_capacity(dbi_name, flags as u64, stat.entries as usize);
    let mut prev: Option<&[u8]> = None;

    for item in txn.cursor(&dbi)? {
        let (key, stored) = item?;
        if !dup_sort && prev == Some(key) {
            return Err(SyncError::DuplicateKey {
                dbi_name: dbi_name.to_string(),
            });
        }
        prev = Some(key);

        let kv = if raw_values {
            Kv {
                key: key.to_vec(),
                value: stored.to_vec(),
                timestamp_nano: 0,
            }
        } else {
            let (ts, payload) = decode_value(stored).ok_or_else(|| SyncError::NoTimestamp {
                dbi_name: dbi_name.to_string(),
                key: key.to_vec(),
            })?;
            Kv {
                key: key.to_vec(),
                value: payload.to_vec(),
                timestamp_nano: ts,
            }
        };
        out.entries.push(kv);
    }

    debug!(
        "read table name={} entries={} flags={:#x} raw={}",
        dbi_name,
        out.len(),
        flags,
        raw_values
    );
    Ok(out)
}

/// Read several tables from one transaction. Stops at the first failure.
pub fn read_tables<T, S>(
    txn: &T,
    names: &[S],
    raw_values: bool,
    opts: &ExtractOptions,
) -> Result<Vec<TableSnapshot>, SyncError>
where
    T: ReadView + ?Sized,
    S: AsRef<str>,
{
    names
        .iter()
        .map(|n| read_table(txn, n.as_ref(), raw_values, opts))
        .collect()
}

/// Names of the tables that take part in synchronization (everything not
/// under the reserved `_sync` prefix), in catalog order.
pub fn syncable_tables<T: ReadView + ?Sized>(txn: &T) -> Result<Vec<String>, SyncError> {
    Ok(txn
        .table_names()?
        .into_iter()
        .filter(|n| !is_sync_table(n))
        .collect())
}
