//! engine/options: configuration accepted by `Env::open`.
//!
//! The sync core treats these as opaque and passes them through unchanged;
//! only the engine interprets them.

use serde::{Deserialize, Serialize};

use super::error::EngineError;
use super::flags::{ENV_NO_LOCK, ENV_NO_SUB_DIR, ENV_NO_SYNC, ENV_READ_ONLY};

pub const DEFAULT_MAP_SIZE: u64 = 1 << 30; // 1 GiB
pub const DEFAULT_MAX_TABLES: u32 = 64;
pub const DEFAULT_MAX_READERS: u32 = 126;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvOptions {
    /// Upper bound for the data size in bytes.
    pub map_size: u64,
    /// Maximum number of named tables (LMDB max_dbs).
    pub max_tables: u32,
    /// Maximum number of concurrently open read transactions.
    pub max_readers: u32,
    /// Bitwise OR of `ENV_*` flags.
    pub flags: u32,
    /// Create the environment (directory and data file) when it is missing.
    pub create: bool,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            map_size: DEFAULT_MAP_SIZE,
            max_tables: DEFAULT_MAX_TABLES,
            max_readers: DEFAULT_MAX_READERS,
            flags: 0,
            create: false,
        }
    }
}

impl EnvOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_map_size(mut self, bytes: u64) -> Self {
        self.map_size = bytes;
        self
    }

    pub fn with_max_tables(mut self, n: u32) -> Self {
        self.max_tables = n;
        self
    }

    pub fn with_max_readers(mut self, n: u32) -> Self {
        self.max_readers = n;
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_create(mut self, on: bool) -> Self {
        self.create = on;
        self
    }

    #[inline]
    pub fn read_only(&self) -> bool {
        self.flags & ENV_READ_ONLY != 0
    }

    #[inline]
    pub fn no_sub_dir(&self) -> bool {
        self.flags & ENV_NO_SUB_DIR != 0
    }

    #[inline]
    pub fn no_sync(&self) -> bool {
        self.flags & ENV_NO_SYNC != 0
    }

    #[inline]
    pub fn no_lock(&self) -> bool {
        self.flags & ENV_NO_LOCK != 0
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        if self.map_size == 0 {
            return Err(EngineError::InvalidOption("map_size must be > 0".into()));
        }
        if self.max_readers == 0 {
            return Err(EngineError::InvalidOption("max_readers must be > 0".into()));
        }
        if self.read_only() && self.create {
            return Err(EngineError::InvalidOption(
                "create cannot be combined with a read-only environment".into(),
            ));
        }
        Ok(())
    }
}
