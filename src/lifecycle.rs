//! lifecycle: open and close the environment, with exactly-once release.
//!
//! `open_env` logs the baseline map size and last transaction id after a
//! successful open. `close_env` never fails: close errors are logged as
//! warnings. `EnvGuard` ties one open environment to a scope and closes it
//! exactly once, whether the scope returns normally, bails out early or
//! unwinds.

use log::{info, warn};
use std::ops::Deref;
use std::path::Path;

use crate::engine::{Env, EnvOptions};
use crate::error::SyncError;
use crate::metrics;
use crate::util::human_size;

/// Open the environment at `path`. The options are passed to the engine as is.
pub fn open_env(path: &Path, opts: &EnvOptions) -> Result<Env, SyncError> {
    info!("opening env path={}", path.display());
    let env = Env::open(path, opts).map_err(|source| SyncError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    metrics::record_env_open();

    match env.info() {
        Ok(i) => info!(
            "env info map_size={} last_txn_id={}",
            human_size(i.map_size),
            i.last_txn_id
        ),
        Err(e) => warn!("env info unavailable path={}: {}", path.display(), e),
    }
    Ok(env)
}

/// Release the environment. Errors are logged, not returned.
pub fn close_env(env: Env) {
    let path = env.path().to_path_buf();
    match env.close() {
        Ok(()) => {
            metrics::record_env_close(true);
            info!("closed env path={}", path.display());
        }
        Err(e) => {
            metrics::record_env_close(false);
            warn!("close env path={}: {}", path.display(), e);
        }
    }
}

/// Scoped environment: closed exactly once when the guard goes away.
pub struct EnvGuard {
    env: Option<Env>,
}

impl EnvGuard {
    pub fn open(path: &Path, opts: &EnvOptions) -> Result<Self, SyncError> {
        open_env(path, opts).map(Self::new)
    }

    /// Take ownership of an already opened environment.
    pub fn new(env: Env) -> Self {
        Self { env: Some(env) }
    }

    pub fn env(&self) -> &Env {
        self
    }

    /// Close now instead of at the end of the scope.
    pub fn close(mut self) {
        if let Some(env) = self.env.take() {
            close_env(env);
        }
    }
}

impl Deref for EnvGuard {
    type Target = Env;

    fn deref(&self) -> &Env {
        match &self.env {
            Some(env) => env,
            // `env` is only taken by `close(self)` and `drop`, which consume the guard
            None => unreachable!("EnvGuard used after close"),
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        if let Some(env) = self.env.take() {
            close_env(env);
        }
    }
}

/// Open `path`, run `f` with the environment and close it afterwards on every
/// exit path. The error type only needs to absorb `SyncError`.
pub fn with_env<T, E, F>(path: &Path, opts: &EnvOptions, f: F) -> Result<T, E>
where
    E: From<SyncError>,
    F: FnOnce(&Env) -> Result<T, E>,
{
    let guard = EnvGuard::open(path, opts)?;
    f(guard.env())
}
