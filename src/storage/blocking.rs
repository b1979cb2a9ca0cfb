use std::sync::{Arc, Mutex, PoisonError};

use tokio::task;

use crate::common::{ChatError, Result};

/// A collection whose calls run on tokio's blocking pool.
///
/// SQLite calls may wait on file locks, so they never run on a runtime worker.
/// Each [`run`](Self::run) closure holds the lock for its whole body; a
/// check-then-write inside one closure is atomic with respect to every other call.
pub struct BlockingCollection<C: ?Sized> {
    inner: Arc<Mutex<Box<C>>>,
}

impl<C: ?Sized + Send + 'static> BlockingCollection<C> {
    pub fn new(collection: Box<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(collection)),
        }
    }

    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut C) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        task::spawn_blocking(move || {
            // A panic mid-call leaves nothing half-written in memory; the rows live in SQLite.
            let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
            op(&mut **guard)
        })
        .await
        .map_err(|err| ChatError::Unavailable(format!("storage task failed: {err}")))?
    }
}
