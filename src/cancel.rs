//! cancel: cancellation tokens with derived scopes.
//!
//! A child token is cancelled together with its parent but can also be
//! cancelled on its own without touching the parent. Waiting is condvar based,
//! so a cancelled waiter wakes immediately.

use std::sync::{Arc, Condvar, Mutex, Weak};
use std::time::{Duration, Instant};

struct Inner {
    cancelled: Mutex<bool>,
    cv: Condvar,
    children: Mutex<Vec<Weak<Inner>>>,
}

impl Inner {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            cancelled: Mutex::new(false),
            cv: Condvar::new(),
            children: Mutex::new(Vec::new()),
        })
    }

    fn is_cancelled(&self) -> bool {
        *self.cancelled.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cancel(&self) {
        {
            let mut c = self.cancelled.lock().unwrap_or_else(|e| e.into_inner());
            if *c {
                return;
            }
            *c = true;
            self.cv.notify_all();
        }
        let children = std::mem::take(&mut *self.children.lock().unwrap_or_else(|e| e.into_inner()));
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            inner: Inner::new(),
        }
    }

    /// Derive a token that is cancelled when `self` is.
    pub fn child(&self) -> CancelToken {
        let child = CancelToken::new();
        // holding the children lock orders us against a concurrent cancel()
        let mut kids = self.inner.children.lock().unwrap_or_else(|e| e.into_inner());
        if self.inner.is_cancelled() {
            child.inner.cancel();
        } else {
            kids.retain(|w| w.strong_count() > 0);
            kids.push(Arc::downgrade(&child.inner));
        }
        drop(kids);
        child
    }

    /// Cancel this token and every token derived from it. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Block for at most `timeout`. Returns true if the token is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut g = self.inner.cancelled.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if *g {
                return true;
            }
            let wait = match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if now >= d {
                        return false;
                    }
                    d - now
                }
                None => Duration::from_secs(3600),
            };
            g = match self.inner.cv.wait_timeout(g, wait) {
                Ok((g, _)) => g,
                Err(e) => e.into_inner().0,
            };
        }
    }
}
