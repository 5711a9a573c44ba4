// tests/env_open.rs
//
// Environment open/close through the lifecycle helpers:
// - open failures surface as SyncError::Open with the engine cause;
// - LMDB's own files (data.mdb, lock.mdb) are what gets opened, and data
//   survives close + reopen;
// - map and table limits surface as engine errors;
// - EnvGuard / with_env release the environment on every exit path.
//
// Run:
//   cargo test --test env_open -- --nocapture

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};

use lightsnap::engine::flags::{ENV_NO_SUB_DIR, ENV_READ_ONLY, TABLE_CREATE};
use lightsnap::engine::{self, EngineError};
use lightsnap::snapshot::encode_value;
use lightsnap::{
    close_env, open_env, read_table, syncable_tables, with_env, EnvGuard, EnvOptions,
    ExtractOptions, SyncError,
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
    base.join(format!("lstest-env-{prefix}-{pid}-{t}-{id}"))
}

fn create_opts() -> EnvOptions {
    EnvOptions::new().with_create(true).with_map_size(8 << 20)
}

fn open_source(err: SyncError) -> EngineError {
    match err {
        SyncError::Open { source, .. } => source,
        other => panic!("expected SyncError::Open, got {other:?}"),
    }
}

#[test]
fn missing_path_without_create() {
    let root = unique_root("missing");
    let err = open_env(&root, &EnvOptions::new()).unwrap_err();
    assert!(err.to_string().contains(&root.display().to_string()));
    assert!(matches!(open_source(err), EngineError::Io { .. }));
}

#[test]
fn missing_data_file_without_create() -> Result<()> {
    let root = unique_root("empty-dir");
    fs::create_dir_all(&root)?;
    let err = open_env(&root, &EnvOptions::new()).unwrap_err();
    match open_source(err) {
        EngineError::Io { path, source } => {
            assert_eq!(path, root.join("data.mdb"));
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!root.join("data.mdb").exists());
    Ok(())
}

#[test]
fn existing_lmdb_files_are_read() -> Result<()> {
    let root = unique_root("existing");
    let env = open_env(&root, &create_opts())?;
    {
        let mut txn = env.begin_rw()?;
        for name in ["orders", "users"] {
            let dbi = txn.create_table(name, TABLE_CREATE)?;
            txn.put(&dbi, b"k", &encode_value(1, b"v"))?;
        }
        txn.commit()?;
    }
    close_env(env);
    assert!(root.join("data.mdb").is_file());
    assert!(root.join("lock.mdb").is_file());

    let env = open_env(&root, &EnvOptions::new())?;
    let txn = env.begin_ro()?;
    assert_eq!(syncable_tables(&txn)?, vec!["orders".to_string(), "users".to_string()]);
    drop(txn);
    close_env(env);
    Ok(())
}

#[test]
fn zero_map_size_is_rejected() {
    let root = unique_root("zero-map");
    let err = open_env(&root, &create_opts().with_map_size(0)).unwrap_err();
    assert!(matches!(open_source(err), EngineError::InvalidOption(_)));
}

#[test]
fn foreign_file_is_incompatible() -> Result<()> {
    let root = unique_root("foreign");
    fs::create_dir_all(&root)?;
    fs::write(root.join("data.mdb"), b"definitely not a data file")?;

    let err = open_env(&root, &EnvOptions::new()).unwrap_err();
    assert!(matches!(open_source(err), EngineError::Incompatible { .. }));
    Ok(())
}

#[test]
fn table_limit_is_tables_full() -> Result<()> {
    let root = unique_root("max-tables");
    let env = open_env(&root, &create_opts().with_max_tables(2))?;
    let mut txn = env.begin_rw()?;
    txn.create_table("a", TABLE_CREATE)?;
    txn.create_table("b", TABLE_CREATE)?;
    let err = txn.create_table("c", TABLE_CREATE).unwrap_err();
    assert!(matches!(err, EngineError::TablesFull { limit: 2 }));
    drop(txn);
    close_env(env);
    Ok(())
}

#[test]
fn small_map_is_map_full() -> Result<()> {
    let root = unique_root("map-full");
    let env = open_env(&root, &create_opts().with_map_size(1 << 20))?;
    let mut txn = env.begin_rw()?;
    let dbi = txn.create_table("big", TABLE_CREATE)?;
    let value = encode_value(1, &vec![7u8; 64 << 10]);
    let mut res = Ok(());
    for i in 0u32..64 {
        res = txn.put(&dbi, &i.to_be_bytes(), &value);
        if res.is_err() {
            break;
        }
    }
    assert!(matches!(res, Err(EngineError::MapFull { map_size }) if map_size == 1 << 20));
    drop(txn);
    close_env(env);
    Ok(())
}

#[test]
fn second_open_in_process_is_refused() -> Result<()> {
    let root = unique_root("twice");
    let env = open_env(&root, &create_opts())?;
    let err = open_env(&root, &create_opts()).unwrap_err();
    assert!(matches!(open_source(err), EngineError::AlreadyOpen(_)));

    close_env(env);
    let again = open_env(&root, &create_opts())?;
    close_env(again);
    Ok(())
}

#[test]
fn data_survives_reopen() -> Result<()> {
    let root = unique_root("reopen");
    let env = open_env(&root, &create_opts())?;
    let txn_id = {
        let mut txn = env.begin_rw()?;
        let dbi = txn.create_table("users", TABLE_CREATE)?;
        txn.put(&dbi, b"alice", &encode_value(11, b"A"))?;
        txn.commit()?
    };
    close_env(env);

    let env = open_env(&root, &EnvOptions::new().with_flags(ENV_READ_ONLY))?;
    assert_eq!(env.info()?.last_txn_id, txn_id);
    assert!(matches!(env.begin_rw(), Err(EngineError::ReadOnly)));

    let txn = env.begin_ro()?;
    let snap = read_table(&txn, "users", false, &ExtractOptions::default())?;
    assert_eq!(snap.entries[0].value, b"A");
    assert_eq!(snap.entries[0].timestamp_nano, 11);
    drop(txn);
    close_env(env);
    Ok(())
}

#[test]
fn read_only_needs_existing_data() {
    let root = unique_root("ro-missing");
    let res = fs::create_dir_all(&root);
    assert!(res.is_ok());
    let err = open_env(&root, &EnvOptions::new().with_flags(ENV_READ_ONLY)).unwrap_err();
    assert!(matches!(open_source(err), EngineError::Io { .. }));
}

#[test]
fn no_sub_dir_layout() -> Result<()> {
    let dir = unique_root("nosubdir");
    fs::create_dir_all(&dir)?;
    let file = dir.join("single.mdb");
    let opts = EnvOptions::new().with_flags(ENV_NO_SUB_DIR).with_create(true);

    let env = open_env(&file, &opts)?;
    {
        let mut txn = env.begin_rw()?;
        let dbi = txn.create_table("t", TABLE_CREATE)?;
        txn.put(&dbi, b"k", &encode_value(1, b"v"))?;
        txn.commit()?;
    }
    assert!(engine::is_open(&file));
    close_env(env);
    assert!(!engine::is_open(&file));

    assert!(file.is_file());
    assert!(dir.join("single.mdb-lock").is_file());

    // the data file now exists, so create is no longer needed
    let env = open_env(&file, &EnvOptions::new().with_flags(ENV_NO_SUB_DIR))?;
    close_env(env);
    Ok(())
}

#[test]
fn guard_closes_on_scope_exit() -> Result<()> {
    let root = unique_root("guard");
    {
        let env = EnvGuard::open(&root, &create_opts())?;
        assert!(engine::is_open(&root));
        assert_eq!(env.info()?.last_txn_id, 0);
    }
    assert!(!engine::is_open(&root));
    Ok(())
}

#[test]
fn guard_closes_on_panic() -> Result<()> {
    let root = unique_root("guard-panic");
    let r = root.clone();
    let res = std::panic::catch_unwind(move || {
        let _env = EnvGuard::open(&r, &create_opts());
        panic!("boom");
    });
    assert!(res.is_err());
    assert!(!engine::is_open(&root));
    Ok(())
}

#[test]
fn with_env_closes_on_error_return() -> Result<()> {
    let root = unique_root("with-env");
    let res: Result<()> = with_env(&root, &create_opts(), |env| {
        let txn = env.begin_ro()?;
        read_table(&txn, "missing", false, &ExtractOptions::default())?;
        Ok(())
    });
    let err = res.map_err(|e| e.to_string()).err().ok_or_else(|| anyhow!("expected an error"))?;
    assert!(err.contains("missing"));
    assert!(!engine::is_open(&root));

    let n = with_env(&root, &create_opts(), |env| -> Result<u64, SyncError> {
        Ok(env.info()?.last_txn_id)
    })?;
    assert_eq!(n, 0);
    assert!(!engine::is_open(&root));
    Ok(())
}

#[test]
fn explicit_guard_close() -> Result<()> {
    let root = unique_root("guard-close");
    let env = EnvGuard::open(&root, &create_opts())?;
    let handle = env.env().clone();
    env.close();
    assert!(handle.is_closed());
    assert!(matches!(handle.begin_ro(), Err(EngineError::Closed)));
    assert!(!engine::is_open(&root));
    Ok(())
}
