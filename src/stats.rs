//! stats: resource usage sampling of an environment.
//!
//! `sample()` collects env info plus the per-table catalog records of one
//! read transaction (optionally leaving one table out) and, when asked, the
//! process memory rollup from /proc/self/smaps_rollup. `log_sample()` writes
//! the result to the log: one info line for the env, one debug line per table.

use log::{debug, info};
use serde::Serialize;
use std::io;

use crate::engine::flags::table_flag_names;
use crate::engine::{EngineError, Env, EnvInfo};
use crate::util::human_size;

const SMAPS_ROLLUP: &str = "/proc/self/smaps_rollup";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSample {
    pub name: String,
    pub flags: u32,
    pub entries: u64,
    pub depth: u32,
    pub branch_pages: u64,
    pub leaf_pages: u64,
    pub overflow_pages: u64,
}

/// Resident memory of the process, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmapsSample {
    pub rss_bytes: u64,
    pub pss_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSample {
    pub info: EnvInfo,
    pub tables: Vec<TableSample>,
    pub smaps: Option<SmapsSample>,
}

/// Sample `env`. `skip` names a table left out of the per-table detail;
/// `smaps` adds the process memory rollup (best-effort, None on failure).
pub fn sample(env: &Env, skip: Option<&str>, smaps: bool) -> Result<EnvSample, EngineError> {
    let info = env.info()?;

    let txn = env.begin_ro()?;
    let mut tables = Vec::new();
    for rec in txn.tables()? {
        if skip == Some(rec.name.as_str()) {
            continue;
        }
        tables.push(TableSample {
            name: rec.name,
            flags: rec.flags,
            entries: rec.entries,
            depth: rec.depth,
            branch_pages: rec.branch_pages,
            leaf_pages: rec.leaf_pages,
            overflow_pages: rec.overflow_pages,
        });
    }
    drop(txn);

    let smaps = if smaps {
        match read_smaps_rollup() {
            Ok(s) => Some(s),
            Err(e) => {
                debug!("smaps scrape failed: {}", e);
                None
            }
        }
    } else {
        None
    };

    Ok(EnvSample {
        info,
        tables,
        smaps,
    })
}

pub fn log_sample(s: &EnvSample) {
    info!(
        "lmdb stats map_size={} disk={} last_txn_id={} readers={}/{} tables={}",
        human_size(s.info.map_size),
        human_size(s.info.disk_bytes),
        s.info.last_txn_id,
        s.info.num_readers,
        s.info.max_readers,
        s.tables.len()
    );
    for t in &s.tables {
        debug!(
            "lmdb dbi stats dbi={} entries={} depth={} pages={}/{}/{} flags=[{}]",
            t.name,
            t.entries,
            t.depth,
            t.branch_pages,
            t.leaf_pages,
            t.overflow_pages,
            table_flag_names(t.flags).join(",")
        );
    }
    if let Some(m) = s.smaps {
        info!(
            "lmdb smaps rss={} pss={}",
            human_size(m.rss_bytes),
            human_size(m.pss_bytes)
        );
    }
}

fn read_smaps_rollup() -> io::Result<SmapsSample> {
    let text = std::fs::read_to_string(SMAPS_ROLLUP)?;
    Ok(parse_smaps(&text))
}

/// Sum the `Rss:` and `Pss:` lines (values in kB) of an smaps document.
pub(crate) fn parse_smaps(text: &str) -> SmapsSample {
    let mut out = SmapsSample::default();
    for line in text.lines() {
        let mut parts = line.split_whitespace();
        let field = parts.next();
        let kb = parts.next().and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);
        match field {
            Some("Rss:") => out.rss_bytes += kb * 1024,
            Some("Pss:") => out.pss_bytes += kb * 1024,
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_smaps_sums_fields() {
        let text = "\
00400000-00452000 r-xp 00000000 08:02 173521 /usr/bin/app
Rss:                 100 kB
Pss:                  50 kB
Pss_Anon:             10 kB
Rss:                  20 kB
";
        let s = parse_smaps(text);
        assert_eq!(s.rss_bytes, 120 * 1024);
        assert_eq!(s.pss_bytes, 50 * 1024);
    }

    #[test]
    fn parse_smaps_ignores_garbage() {
        assert_eq!(parse_smaps("nothing here\nRss: lots kB"), SmapsSample::default());
    }
}
