//! Per-record lock registry
//!
//! Mutating operations on a single item (quantity update, delete, mark-done)
//! hold the item's lock across their whole read-modify-write so concurrent
//! writers cannot clobber each other. Locks are created on first use and
//! shared between the cart and batch stores.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct LockRegistry {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self { locks: Mutex::new(HashMap::new()) }
    }

    /// Acquire the lock for a key, waiting if another task holds it.
    ///
    /// The guard is owned so it can be held across await points in the
    /// caller's read-modify-write.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        lock.lock_owned().await
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new()
    }
}
