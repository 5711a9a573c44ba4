// tests/monitor.rs
//
// Stats monitor lifecycle without wall-clock dependence: a manual ticker
// drives the loop and a recording sampler counts samples.
//
// Run:
//   cargo test --test monitor -- --nocapture

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Result;

use lightsnap::engine::flags::TABLE_CREATE;
use lightsnap::monitor::{
    start_stats_monitor_with, LogSampler, ManualTicker, Sampler, StatsMonitor,
};
use lightsnap::snapshot::encode_value;
use lightsnap::stats;
use lightsnap::{
    start_stats_monitor, CancelToken, EngineError, Env, EnvOptions, MonitorOptions,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("lstest-monitor-{prefix}-{pid}-{t}-{id}"))
}

fn open_new(prefix: &str) -> Result<Env> {
    let opts = EnvOptions::new().with_create(true).with_map_size(4 << 20);
    Ok(Env::open(&unique_root(prefix), &opts)?)
}

#[derive(Clone, Default)]
struct Recording {
    samples: Arc<AtomicUsize>,
    fail: bool,
}

impl Sampler for Recording {
    fn sample(&mut self, _env: &Env) -> Result<(), EngineError> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(EngineError::Closed)
        } else {
            Ok(())
        }
    }
}

fn wait_for(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn zero_interval_starts_nothing() -> Result<()> {
    let env = open_new("disabled")?;
    let root = CancelToken::new();
    let rec = Recording::default();
    let opts = MonitorOptions {
        interval: Duration::ZERO,
        ..MonitorOptions::default()
    };

    assert!(start_stats_monitor_with(&root, &env, &opts, rec.clone()).is_none());
    assert!(start_stats_monitor(&root, &env, &opts).is_none());
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(rec.samples.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn samples_once_per_tick() -> Result<()> {
    let env = open_new("ticks")?;
    let root = CancelToken::new();
    let (ticker, handle) = ManualTicker::new();
    let rec = Recording::default();
    let monitor = StatsMonitor::start_with(&root, env.clone(), ticker, rec.clone());

    for n in 1..=3 {
        handle.tick();
        wait_for("sample", || rec.samples.load(Ordering::SeqCst) == n);
    }
    assert!(monitor.is_running());
    monitor.join();
    assert_eq!(rec.samples.load(Ordering::SeqCst), 3);
    Ok(())
}

#[test]
fn cancelling_parent_stops_sampling() -> Result<()> {
    let env = open_new("cancel")?;
    let root = CancelToken::new();
    let (ticker, handle) = ManualTicker::new();
    let rec = Recording::default();
    let monitor = StatsMonitor::start_with(&root, env.clone(), ticker, rec.clone());

    handle.tick();
    wait_for("first sample", || rec.samples.load(Ordering::SeqCst) == 1);

    root.cancel();
    wait_for("monitor exit", || !monitor.is_running());
    handle.tick();
    handle.tick();
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(rec.samples.load(Ordering::SeqCst), 1);

    // the caller's token is unaffected by the monitor's own stop
    let other = CancelToken::new();
    let (ticker, _h) = ManualTicker::new();
    let m2 = StatsMonitor::start_with(&other, env, ticker, Recording::default());
    m2.stop();
    wait_for("stopped", || !m2.is_running());
    assert!(!other.is_cancelled());
    Ok(())
}

#[test]
fn sampling_errors_do_not_stop_the_loop() -> Result<()> {
    let env = open_new("errors")?;
    let root = CancelToken::new();
    let (ticker, handle) = ManualTicker::new();
    let rec = Recording {
        fail: true,
        ..Recording::default()
    };
    let monitor = StatsMonitor::start_with(&root, env, ticker, rec.clone());

    handle.tick();
    handle.tick();
    wait_for("two failed samples", || rec.samples.load(Ordering::SeqCst) == 2);
    assert!(monitor.is_running());
    monitor.join();
    Ok(())
}

#[test]
fn interval_monitor_stops_promptly() -> Result<()> {
    let env = open_new("interval")?;
    let root = CancelToken::new();
    let rec = Recording::default();
    let opts = MonitorOptions {
        interval: Duration::from_millis(10),
        ..MonitorOptions::default()
    };
    let monitor = start_stats_monitor_with(&root, &env, &opts, rec.clone());
    let monitor = monitor.ok_or_else(|| anyhow::anyhow!("monitor not started"))?;

    wait_for("a few samples", || rec.samples.load(Ordering::SeqCst) >= 2);
    let started = Instant::now();
    root.cancel();
    monitor.join();
    assert!(started.elapsed() < Duration::from_secs(1));

    let after = rec.samples.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(rec.samples.load(Ordering::SeqCst), after);
    Ok(())
}

#[test]
fn log_sampler_skips_internal_table() -> Result<()> {
    let env = open_new("skip")?;
    {
        let mut txn = env.begin_rw()?;
        for name in ["_sync", "users"] {
            let dbi = txn.create_table(name, TABLE_CREATE)?;
            txn.put(&dbi, b"k", &encode_value(1, b"v"))?;
        }
        txn.commit()?;
    }

    let s = stats::sample(&env, Some("_sync"), false)?;
    let names: Vec<&str> = s.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["users"]);
    assert_eq!(s.tables[0].entries, 1);
    assert_eq!(s.tables[0].depth, 1);
    assert_eq!(s.tables[0].leaf_pages, 1);
    assert!(s.info.disk_bytes > 0);
    assert_eq!(s.info.last_txn_id, 1);
    assert!(s.smaps.is_none());

    // the production sampler runs against the same env
    let mut sampler = LogSampler::new(Some("_sync".into()), false);
    sampler.sample(&env)?;

    // a closed env makes sampling fail instead of panicking
    env.clone().close()?;
    assert!(matches!(sampler.sample(&env), Err(EngineError::Closed)));
    Ok(())
}

#[test]
fn dropping_handle_detaches() -> Result<()> {
    let env = open_new("detach")?;
    let root = CancelToken::new();
    let (ticker, handle) = ManualTicker::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    struct Pushing(Arc<Mutex<Vec<u64>>>);
    impl Sampler for Pushing {
        fn sample(&mut self, env: &Env) -> Result<(), EngineError> {
            let id = env.info()?.last_txn_id;
            self.0.lock().unwrap_or_else(|e| e.into_inner()).push(id);
            Ok(())
        }
    }

    drop(StatsMonitor::start_with(
        &root,
        env,
        ticker,
        Pushing(Arc::clone(&seen)),
    ));
    handle.tick();
    wait_for("detached sample", || seen.lock().map(|v| v.len() == 1).unwrap_or(false));
    root.cancel();
    Ok(())
}
