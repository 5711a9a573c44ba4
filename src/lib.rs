//! lightsnap: read-side core of a multi-master sync engine.
//!
//! Snapshots the tables of an LMDB environment into
//! timestamp-annotated records, manages the environment handle and runs a
//! cancellable stats logger next to it.

// LMDB access (heed) the snapshots are taken from
pub mod engine; // src/engine/{mod,env,txn,catalog,flags,options,error}.rs

// Core
pub mod identity;
pub mod lifecycle;
pub mod extract;
pub mod monitor;

// Records and errors
pub mod snapshot;
pub mod error;

// Support
pub mod cancel;
pub mod stats;
pub mod config;
pub mod consts;
pub mod metrics;
pub mod util; // src/util/mod.rs

// Convenience re-exports
pub use cancel::CancelToken;
pub use config::{ConfigError, SyncConfig, SyncConfigBuilder};
pub use engine::{EngineError, Env, EnvOptions, ReadView};
pub use error::SyncError;
pub use extract::{read_table, read_tables, syncable_tables, ExtractOptions};
pub use identity::{generation_id, instance_id, HostIdentity};
pub use lifecycle::{close_env, open_env, with_env, EnvGuard};
pub use monitor::{start_stats_monitor, MonitorOptions, StatsMonitor};
pub use snapshot::{Kv, TableSnapshot};
