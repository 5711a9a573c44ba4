//! engine: thin layer over LMDB (via heed) that the sync core reads from.
//!
//! Submodules:
//! - env.rs: Env handle, open/close, info/stat, transaction entry points
//! - txn.rs: RoTxn/RwTxn, ReadView trait, Dbi handles, Cursor
//! - catalog.rs: MDB_db records of the main database (flags, counters)
//! - options.rs: EnvOptions (serde) passed through unchanged by callers
//! - flags.rs: ENV_*/TABLE_* flag constants (LMDB bit layout)
//! - error.rs: EngineError

pub mod catalog;
pub mod env;
pub mod error;
pub mod flags;
pub mod options;
pub mod txn;

pub use catalog::TableRecord;
pub use env::{is_open, Env, EnvInfo, EnvStat};
pub use error::EngineError;
pub use options::EnvOptions;
pub use txn::{Cursor, Dbi, ReadView, RoTxn, RwTxn, TableStat};
