//! Shared state access.
//!
//! All reads and writes go through [`Store::transact`], which runs a closure
//! with exclusive access to the [`AppState`]. A check-then-act sequence such
//! as "is it red's turn? then drop red's piece" therefore cannot interleave
//! with a competing request.

use std::sync::Arc;

use parking_lot::Mutex;

use super::AppState;

/// Exclusive access to application state.
pub trait Store: Send + Sync {
    /// Run `f` with exclusive access and return its result.
    fn transact<R>(&self, f: impl FnOnce(&mut AppState) -> R) -> R;

    /// Run `f` with read access.
    fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        self.transact(|state| f(state))
    }
}

/// Process-local store behind a single mutex.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<AppState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: AppState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }
}

impl Store for InMemoryStore {
    fn transact<R>(&self, f: impl FnOnce(&mut AppState) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }
}
