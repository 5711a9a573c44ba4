//! error: failures of the extraction path and environment lifecycle.
//!
//! Every variant carries the structured context (table name, key) so callers
//! can match on the kind instead of parsing messages. None of these are
//! retried internally.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::EngineError;
use crate::util::display_ascii;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The environment could not be opened.
    #[error("open env {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: EngineError,
    },

    /// A named table could not be opened within the transaction.
    #[error("open dbi {dbi_name:?}: {source}")]
    TableOpen {
        dbi_name: String,
        #[source]
        source: EngineError,
    },

    /// The table allows multiple values per key and `dupsort_hack` is off.
    #[error("dupsort db {dbi_name} found and dupsort_hack disabled")]
    MultiValueUnsupported { dbi_name: String },

    /// Two adjacent entries share a key in a table without dup-sort.
    #[error("duplicate key detected in DBI {dbi_name:?} without dupsort_hack, refusing to continue")]
    DuplicateKey { dbi_name: String },

    /// A stored value is too short to carry the timestamp header.
    #[error("no timestamp for entry (dbi {dbi_name}, key {})", display_ascii(.key))]
    NoTimestamp { dbi_name: String, key: Vec<u8> },

    /// Any other engine failure while reading a table.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl SyncError {
    /// Name of the table the error refers to, if any.
    pub fn dbi_name(&self) -> Option<&str> {
        match self {
            SyncError::TableOpen { dbi_name, .. }
            | SyncError::MultiValueUnsupported { dbi_name }
            | SyncError::DuplicateKey { dbi_name }
            | SyncError::NoTimestamp { dbi_name, .. } => Some(dbi_name),
            SyncError::Open { .. } | SyncError::Engine(_) => None,
        }
    }

    /// Data-integrity errors point at the stored data, not at a transient fault.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            SyncError::DuplicateKey { .. } | SyncError::NoTimestamp { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_timestamp_message_escapes_key() {
        let e = SyncError::NoTimestamp {
            dbi_name: "users".into(),
            key: vec![b'k', 0x01],
        };
        assert_eq!(e.to_string(), "no timestamp for entry (dbi users, key k\\x01)");
        assert_eq!(e.dbi_name(), Some("users"));
        assert!(e.is_data_integrity());
    }

    #[test]
    fn open_error_keeps_source() {
        use std::error::Error as _;
        let e = SyncError::Open {
            path: PathBuf::from("/nope"),
            source: EngineError::Closed,
        };
        assert!(e.source().is_some());
        assert!(e.dbi_name().is_none());
        assert!(!e.is_data_integrity());
    }
}
