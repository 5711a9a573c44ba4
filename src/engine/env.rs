//! engine/env: environment handle: open, info, transactions, close.
//!
//! Layout on disk is LMDB's own:
//! - default:          <path>/data.mdb + <path>/lock.mdb
//! - ENV_NO_SUB_DIR:   <path> is the data file, lock at <path>-lock
//!
//! An environment may be open only once per process (registry keyed by the
//! canonical path). `Env` is a cheap clonable handle; `close()` on any clone
//! closes the environment for all of them and later calls fail with
//! `EngineError::Closed`. The LMDB handle itself is released when the last
//! clone is dropped.

use heed::EnvOpenOptions;
use log::{debug, warn};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use super::error::{EngineError, ErrorContext};
use super::flags::env_flags;
use super::options::EnvOptions;
use super::txn::{catalog, RoTxn, RwTxn};

pub const DATA_FILE: &str = "data.mdb";
pub const LOCK_FILE: &str = "lock.mdb";

static OPEN_ENVS: Mutex<BTreeSet<PathBuf>> = Mutex::new(BTreeSet::new());

/// Registry slot of an open environment; frees the path on drop.
struct RegistrySlot(PathBuf);

impl RegistrySlot {
    fn claim(key: PathBuf) -> Result<Self, EngineError> {
        let mut g = OPEN_ENVS.lock().unwrap_or_else(|e| e.into_inner());
        if !g.insert(key.clone()) {
            return Err(EngineError::AlreadyOpen(key));
        }
        Ok(Self(key))
    }
}

impl Drop for RegistrySlot {
    fn drop(&mut self) {
        let mut g = OPEN_ENVS.lock().unwrap_or_else(|e| e.into_inner());
        g.remove(&self.0);
    }
}

/// True while an environment for `path` is open in this process.
pub fn is_open(path: &Path) -> bool {
    match registry_key(path) {
        Ok(key) => OPEN_ENVS
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&key),
        Err(_) => false,
    }
}

/// Baseline environment information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvInfo {
    pub map_size: u64,
    pub last_txn_id: u64,
    pub last_page: u64,
    pub num_readers: u32,
    pub max_readers: u32,
    /// Size of the data file on disk.
    pub disk_bytes: u64,
}

/// Totals over the environment's table catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvStat {
    pub tables: u64,
    pub entries: u64,
    pub pages: u64,
}

struct Shared {
    path: PathBuf,
    opts: EnvOptions,
    closed: AtomicBool,
    /// Live read transactions opened through this handle.
    readers: AtomicU32,
    slot: Mutex<Option<RegistrySlot>>,
}

#[derive(Clone)]
pub struct Env {
    pub(crate) inner: heed::Env,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("path", &self.shared.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn not_found(path: &Path, what: &str) -> EngineError {
    EngineError::io(path, io::Error::new(io::ErrorKind::NotFound, what.to_string()))
}

/// Check (or create) what LMDB expects to find at `path`.
fn prepare_layout(path: &Path, opts: &EnvOptions) -> Result<(), EngineError> {
    if opts.no_sub_dir() {
        if path.is_file() {
            return Ok(());
        }
        if !opts.create {
            return Err(not_found(path, "data file missing"));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
        }
        // LMDB initialises an empty data file as a new environment
        fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| EngineError::io(path, e))?;
        return Ok(());
    }

    match fs::metadata(path) {
        Ok(md) if md.is_dir() => {
            if !opts.create && !path.join(DATA_FILE).is_file() {
                return Err(not_found(&path.join(DATA_FILE), "data file missing"));
            }
            Ok(())
        }
        Ok(_) => Err(EngineError::io(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound && opts.create => {
            fs::create_dir_all(path).map_err(|e| EngineError::io(path, e))
        }
        Err(e) => Err(EngineError::io(path, e)),
    }
}

/// Canonical parent joined with the file name; the same key for both layouts.
fn registry_key(path: &Path) -> Result<PathBuf, EngineError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let parent = fs::canonicalize(&parent).map_err(|e| EngineError::io(&parent, e))?;
    Ok(match path.file_name() {
        Some(name) => parent.join(name),
        None => parent,
    })
}

impl Env {
    pub fn open(path: &Path, opts: &EnvOptions) -> Result<Self, EngineError> {
        opts.validate()?;
        let map_size = usize::try_from(opts.map_size).map_err(|_| {
            EngineError::InvalidOption(format!("map_size {} exceeds the address space", opts.map_size))
        })?;

        prepare_layout(path, opts)?;
        let slot = RegistrySlot::claim(registry_key(path)?)?;

        let mut builder = EnvOpenOptions::new();
        builder
            .map_size(map_size)
            .max_dbs(opts.max_tables)
            .max_readers(opts.max_readers);
        // SAFETY: NO_SYNC and NO_LOCK trade durability and locking for speed;
        // callers opt into them explicitly through EnvOptions.
        unsafe {
            builder.flags(env_flags(opts.flags));
        }
        // SAFETY: the registry slot guarantees this path is opened once per
        // process, and the data file is only mapped by LMDB.
        let inner = unsafe { builder.open(path) }.map_err(|e| {
            EngineError::from_heed(
                e,
                &ErrorContext {
                    path,
                    map_size: opts.map_size,
                    max_tables: opts.max_tables,
                    max_readers: opts.max_readers,
                },
            )
        })?;

        debug!(
            "env open path={} flags={:#x} map_size={}",
            path.display(),
            opts.flags,
            opts.map_size
        );

        Ok(Self {
            inner,
            shared: Arc::new(Shared {
                path: path.to_path_buf(),
                opts: opts.clone(),
                closed: AtomicBool::new(false),
                readers: AtomicU32::new(0),
                slot: Mutex::new(Some(slot)),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn options(&self) -> &EnvOptions {
        &self.shared.opts
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_open(&self) -> Result<(), EngineError> {
        if self.is_closed() {
            return Err(EngineError::Closed);
        }
        Ok(())
    }

    pub(crate) fn error(&self, err: heed::Error) -> EngineError {
        let opts = &self.shared.opts;
        EngineError::from_heed(
            err,
            &ErrorContext {
                path: &self.shared.path,
                map_size: opts.map_size,
                max_tables: opts.max_tables,
                max_readers: opts.max_readers,
            },
        )
    }

    pub fn info(&self) -> Result<EnvInfo, EngineError> {
        self.ensure_open()?;
        let i = self.inner.info();
        let disk_bytes = self.inner.real_disk_size().map_err(|e| self.error(e))?;
        Ok(EnvInfo {
            map_size: i.map_size as u64,
            last_txn_id: i.last_txn_id as u64,
            last_page: i.last_page_number as u64,
            num_readers: i.number_of_readers,
            max_readers: i.maximum_number_of_readers,
            disk_bytes,
        })
    }

    pub fn stat(&self) -> Result<EnvStat, EngineError> {
        let txn = self.begin_ro()?;
        let records = catalog(self, txn.raw())?;
        Ok(EnvStat {
            tables: records.len() as u64,
            entries: records.iter().map(|r| r.entries).sum(),
            pages: records.iter().map(|r| r.pages()).sum(),
        })
    }

    /// Begin a read-only transaction over the last committed state.
    pub fn begin_ro(&self) -> Result<RoTxn<'_>, EngineError> {
        self.ensure_open()?;
        let txn = self.inner.read_txn().map_err(|e| self.error(e))?;
        self.shared.readers.fetch_add(1, Ordering::AcqRel);
        Ok(RoTxn::new(self, txn))
    }

    /// Begin the single write transaction; blocks while another writer is active.
    pub fn begin_rw(&self) -> Result<RwTxn<'_>, EngineError> {
        self.ensure_open()?;
        if self.shared.opts.read_only() {
            return Err(EngineError::ReadOnly);
        }
        let txn = self.inner.write_txn().map_err(|e| self.error(e))?;
        // the env may have been closed while waiting for the writer lock
        self.ensure_open()?;
        Ok(RwTxn::new(self, txn))
    }

    pub(crate) fn reader_done(&self) {
        self.shared.readers.fetch_sub(1, Ordering::AcqRel);
    }

    /// Close the environment. Later calls on any clone fail with `Closed`.
    /// Closing an already closed environment is a no-op.
    pub fn close(self) -> Result<(), EngineError> {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let readers = self.shared.readers.load(Ordering::Acquire);
        if readers > 0 {
            warn!(
                "env close with {} live read transaction(s) path={}",
                readers,
                self.shared.path.display()
            );
        }
        self.shared
            .slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if self.shared.opts.no_sync() && !self.shared.opts.read_only() {
            self.inner.force_sync().map_err(|e| self.error(e))?;
        }
        Ok(())
    }
}
