use anyhow::{anyhow, Result};
use log::info;
use std::path::PathBuf;

use lightsnap::util::parse_duration;
use lightsnap::{start_stats_monitor, CancelToken, EnvGuard};

use super::util::load_config;

pub fn exec(path: Option<PathBuf>, interval: Option<String>, duration: String, smaps: bool) -> Result<()> {
    let mut cfg = load_config(path);
    if let Some(s) = interval {
        cfg = cfg.with_log_stats_interval(parse_duration(&s).map_err(|e| anyhow!(e))?);
    }
    if smaps {
        cfg = cfg.with_scrape_smaps(true);
    }
    let run_for = parse_duration(&duration).map_err(|e| anyhow!(e))?;

    let env = EnvGuard::open(&cfg.lmdb_path, &cfg.lmdb_options)?;
    let root = CancelToken::new();
    let monitor = start_stats_monitor(&root, &env, &cfg.monitor_options());

    // returns early only if cancelled, which nothing else does here
    root.wait_timeout(run_for);
    root.cancel();
    if let Some(m) = monitor {
        m.join();
    }
    info!("stats run finished after {:?}", run_for);
    Ok(())
}
