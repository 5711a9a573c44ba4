//! engine/error: failures reported by the storage engine.

use std::io;
use std::path::PathBuf;

use heed::MdbError;
use thiserror::Error;

/// Error returned by every fallible engine call.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("environment {0} is already open in this process")]
    AlreadyOpen(PathBuf),

    #[error("environment is closed")]
    Closed,

    #[error("incompatible environment {path}: {reason}")]
    Incompatible { path: PathBuf, reason: String },

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("map full: map size is {map_size} bytes")]
    MapFull { map_size: u64 },

    #[error("too many tables: limit is {limit}")]
    TablesFull { limit: u32 },

    #[error("too many readers: limit is {limit}")]
    ReadersFull { limit: u32 },

    #[error("table {0:?} not found")]
    NotFound(String),

    #[error("table {0:?} exists with incompatible flags")]
    IncompatibleTable(String),

    #[error("environment is read-only")]
    ReadOnly,

    /// Any other LMDB failure, kept as its message.
    #[error("lmdb: {0}")]
    Lmdb(String),
}

/// What an error mapping needs to know about the environment.
pub(crate) struct ErrorContext<'a> {
    pub path: &'a std::path::Path,
    pub map_size: u64,
    pub max_tables: u32,
    pub max_readers: u32,
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn from_heed(err: heed::Error, cx: &ErrorContext<'_>) -> Self {
        match err {
            heed::Error::Io(source) => EngineError::io(cx.path, source),
            heed::Error::Mdb(MdbError::MapFull) => EngineError::MapFull {
                map_size: cx.map_size,
            },
            heed::Error::Mdb(MdbError::DbsFull) => EngineError::TablesFull {
                limit: cx.max_tables,
            },
            heed::Error::Mdb(MdbError::ReadersFull) => EngineError::ReadersFull {
                limit: cx.max_readers,
            },
            heed::Error::Mdb(m @ (MdbError::Invalid | MdbError::VersionMismatch)) => {
                EngineError::Incompatible {
                    path: cx.path.to_path_buf(),
                    reason: m.to_string(),
                }
            }
            other => EngineError::Lmdb(other.to_string()),
        }
    }

    /// True when the error means "the named table does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }
}
