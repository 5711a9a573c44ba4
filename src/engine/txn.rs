//! engine/txn: read and write transactions, table handles and cursors.
//!
//! - RoTxn wraps an LMDB read transaction: one consistent snapshot for its
//!   whole life, never blocking the writer.
//! - RwTxn wraps the single write transaction; commit publishes the changes,
//!   drop or `abort()` discards them.
//!
//! Table flags and page counters are read from the main database catalog
//! (see catalog.rs); entry counts come from the table itself so a write
//! transaction sees its own uncommitted rows.

use heed::types::Bytes;
use heed::{Database, MdbError};

use super::catalog::TableRecord;
use super::env::Env;
use super::error::EngineError;
use super::flags::{table_flags, TABLE_CREATE, TABLE_PERSISTENT_MASK};

type RawDb = Database<Bytes, Bytes>;

/// Handle of a named table, valid within the transaction that opened it.
#[derive(Clone)]
pub struct Dbi {
    name: String,
    db: RawDb,
    flags: u32,
}

impl Dbi {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Dbi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dbi")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStat {
    pub entries: u64,
    pub depth: u32,
    pub branch_pages: u64,
    pub leaf_pages: u64,
    pub overflow_pages: u64,
    pub flags: u32,
}

type Entry<'t> = Result<(&'t [u8], &'t [u8]), EngineError>;

/// Forward-only pass over a table in its native order. Not restartable:
/// once an entry has been yielded it is gone from the cursor.
pub struct Cursor<'t> {
    inner: Box<dyn Iterator<Item = Entry<'t>> + 't>,
}

impl<'t> Cursor<'t> {
    /// Wrap any source of table entries; used by views that are not backed by LMDB.
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Entry<'t>> + 't,
    {
        Self {
            inner: Box::new(iter),
        }
    }
}

impl<'t> Iterator for Cursor<'t> {
    type Item = Entry<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Read access shared by read-only and read-write transactions.
pub trait ReadView {
    /// Handle returned by `open_table`.
    type Table;

    /// Open an existing named table.
    fn open_table(&self, name: &str) -> Result<Self::Table, EngineError>;
    fn stat(&self, table: &Self::Table) -> Result<TableStat, EngineError>;
    fn flags(&self, table: &Self::Table) -> Result<u32, EngineError>;
    fn cursor(&self, table: &Self::Table) -> Result<Cursor<'_>, EngineError>;
    /// Names of all tables, in catalog order.
    fn table_names(&self) -> Result<Vec<String>, EngineError>;
}

// -------------------- shared helpers --------------------

fn main_db(env: &Env, txn: &heed::RoTxn<'_>) -> Result<Option<RawDb>, EngineError> {
    env.inner
        .open_database::<Bytes, Bytes>(txn, None)
        .map_err(|e| env.error(e))
}

/// Catalog records of every named table.
pub(crate) fn catalog(env: &Env, txn: &heed::RoTxn<'_>) -> Result<Vec<TableRecord>, EngineError> {
    let Some(main) = main_db(env, txn)? else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for item in main.iter(txn).map_err(|e| env.error(e))? {
        let (key, val) = item.map_err(|e| env.error(e))?;
        if let Some(rec) = TableRecord::decode(key, val) {
            out.push(rec);
        }
    }
    Ok(out)
}

fn record(env: &Env, txn: &heed::RoTxn<'_>, name: &str) -> Result<Option<TableRecord>, EngineError> {
    let Some(main) = main_db(env, txn)? else {
        return Ok(None);
    };
    let val = main
        .get(txn, name.as_bytes())
        .map_err(|e| env.error(e))?;
    Ok(val.and_then(|v| TableRecord::decode(name.as_bytes(), v)))
}

fn table_error(env: &Env, name: &str, err: heed::Error) -> EngineError {
    match err {
        heed::Error::Mdb(MdbError::Incompatible) => EngineError::IncompatibleTable(name.to_string()),
        other => env.error(other),
    }
}

fn open_in(env: &Env, txn: &heed::RoTxn<'_>, name: &str) -> Result<Dbi, EngineError> {
    env.ensure_open()?;
    let db = env
        .inner
        .open_database::<Bytes, Bytes>(txn, Some(name))
        .map_err(|e| table_error(env, name, e))?
        .ok_or_else(|| EngineError::NotFound(name.to_string()))?;
    let flags = record(env, txn, name)?.map_or(0, |r| r.flags);
    Ok(Dbi {
        name: name.to_string(),
        db,
        flags,
    })
}

fn stat_in(env: &Env, txn: &heed::RoTxn<'_>, dbi: &Dbi) -> Result<TableStat, EngineError> {
    env.ensure_open()?;
    let entries = dbi.db.len(txn).map_err(|e| env.error(e))?;
    let rec = record(env, txn, &dbi.name)?;
    Ok(match rec {
        Some(r) => TableStat {
            entries,
            depth: r.depth,
            branch_pages: r.branch_pages,
            leaf_pages: r.leaf_pages,
            overflow_pages: r.overflow_pages,
            flags: dbi.flags,
        },
        None => TableStat {
            entries,
            flags: dbi.flags,
            ..TableStat::default()
        },
    })
}

fn cursor_in<'t>(env: &'t Env, txn: &'t heed::RoTxn<'_>, dbi: &Dbi) -> Result<Cursor<'t>, EngineError> {
    env.ensure_open()?;
    let iter = dbi.db.iter(txn).map_err(|e| env.error(e))?;
    Ok(Cursor::new(iter.map(move |item| item.map_err(|e| env.error(e)))))
}

fn names_in(env: &Env, txn: &heed::RoTxn<'_>) -> Result<Vec<String>, EngineError> {
    env.ensure_open()?;
    Ok(catalog(env, txn)?.into_iter().map(|r| r.name).collect())
}

// -------------------- RoTxn --------------------

pub struct RoTxn<'e> {
    env: &'e Env,
    txn: heed::RoTxn<'e>,
}

impl<'e> RoTxn<'e> {
    pub(crate) fn new(env: &'e Env, txn: heed::RoTxn<'e>) -> Self {
        Self { env, txn }
    }

    pub(crate) fn raw(&self) -> &heed::RoTxn<'e> {
        &self.txn
    }

    /// Catalog records of every table as of this snapshot.
    pub fn tables(&self) -> Result<Vec<TableRecord>, EngineError> {
        self.env.ensure_open()?;
        catalog(self.env, &self.txn)
    }
}

impl Drop for RoTxn<'_> {
    fn drop(&mut self) {
        self.env.reader_done();
    }
}

impl ReadView for RoTxn<'_> {
    type Table = Dbi;

    fn open_table(&self, name: &str) -> Result<Dbi, EngineError> {
        open_in(self.env, &self.txn, name)
    }

    fn stat(&self, dbi: &Dbi) -> Result<TableStat, EngineError> {
        stat_in(self.env, &self.txn, dbi)
    }

    fn flags(&self, dbi: &Dbi) -> Result<u32, EngineError> {
        self.env.ensure_open()?;
        Ok(dbi.flags)
    }

    fn cursor(&self, dbi: &Dbi) -> Result<Cursor<'_>, EngineError> {
        cursor_in(self.env, &self.txn, dbi)
    }

    fn table_names(&self) -> Result<Vec<String>, EngineError> {
        names_in(self.env, &self.txn)
    }
}

// -------------------- RwTxn --------------------

pub struct RwTxn<'e> {
    env: &'e Env,
    txn: heed::RwTxn<'e>,
}

impl<'e> RwTxn<'e> {
    pub(crate) fn new(env: &'e Env, txn: heed::RwTxn<'e>) -> Self {
        Self { env, txn }
    }

    /// Open a table; with TABLE_CREATE it is created with `flags` when missing.
    pub fn create_table(&mut self, name: &str, flags: u32) -> Result<Dbi, EngineError> {
        self.env.ensure_open()?;
        if flags & TABLE_CREATE == 0 {
            return open_in(self.env, &self.txn, name);
        }
        if name.is_empty() {
            return Err(EngineError::InvalidOption("table name must not be empty".into()));
        }
        let env = self.env;
        let db: RawDb = env
            .inner
            .database_options()
            .types::<Bytes, Bytes>()
            .name(name)
            .flags(table_flags(flags))
            .create(&mut self.txn)
            .map_err(|e| table_error(env, name, e))?;
        let flags = record(env, &self.txn, name)?.map_or(flags & TABLE_PERSISTENT_MASK, |r| r.flags);
        Ok(Dbi {
            name: name.to_string(),
            db,
            flags,
        })
    }

    /// Store `val` under `key`. Non-dup tables replace an existing value;
    /// dup-sort tables add the pair at its sorted position.
    pub fn put(&mut self, dbi: &Dbi, key: &[u8], val: &[u8]) -> Result<(), EngineError> {
        self.env.ensure_open()?;
        dbi.db
            .put(&mut self.txn, key, val)
            .map_err(|e| self.env.error(e))
    }

    /// Publish the changes. Returns the id of the last committed transaction.
    pub fn commit(self) -> Result<u64, EngineError> {
        let env = self.env;
        env.ensure_open()?;
        self.txn.commit().map_err(|e| env.error(e))?;
        Ok(env.inner.info().last_txn_id as u64)
    }

    /// Discard the changes (same as dropping the transaction).
    pub fn abort(self) {
        self.txn.abort();
    }
}

impl ReadView for RwTxn<'_> {
    type Table = Dbi;

    fn open_table(&self, name: &str) -> Result<Dbi, EngineError> {
        open_in(self.env, &self.txn, name)
    }

    fn stat(&self, dbi: &Dbi) -> Result<TableStat, EngineError> {
        stat_in(self.env, &self.txn, dbi)
    }

    fn flags(&self, dbi: &Dbi) -> Result<u32, EngineError> {
        self.env.ensure_open()?;
        Ok(dbi.flags)
    }

    fn cursor(&self, dbi: &Dbi) -> Result<Cursor<'_>, EngineError> {
        cursor_in(self.env, &self.txn, dbi)
    }

    fn table_names(&self) -> Result<Vec<String>, EngineError> {
        names_in(self.env, &self.txn)
    }
}
