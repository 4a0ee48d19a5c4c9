//! Launch orchestration
//!
//! Moves every currently staged item into a fresh batch and captures the
//! manifest. Written against the repository traits so the state machine is
//! testable with mocks and independent of the storage substrate.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::core::render_manifest;
use crate::error::{FactoryError, FactoryResult};
use crate::traits::{BatchRepository, ItemRepository};
use shared::LaunchReceipt;

pub struct Launcher<I, B> {
    items: I,
    batches: B,
    launch_lock: Arc<Mutex<()>>,
}

impl<I: Clone, B: Clone> Clone for Launcher<I, B> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            batches: self.batches.clone(),
            launch_lock: self.launch_lock.clone(),
        }
    }
}

impl<I, B> Launcher<I, B>
where
    I: ItemRepository,
    B: BatchRepository,
{
    pub fn new(items: I, batches: B) -> Self {
        Self {
            items,
            batches,
            launch_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Launch all staged items into a new production batch.
    ///
    /// Best-effort by design: items are moved one at a time in listing
    /// order (newest first); a failed move leaves that item in the cart and
    /// the rest of the launch continues. Already moved items are never
    /// rolled back. The manifest and the receipt cover exactly the items
    /// that made it into the batch, and items staged after the snapshot was
    /// taken simply wait for the next launch.
    pub async fn launch(&self) -> FactoryResult<LaunchReceipt> {
        // Serialized against itself: two launches must never race for the
        // same identifier or double-move an item
        let _guard = self.launch_lock.lock().await;

        let snapshot = self.items.list().await?;
        if snapshot.is_empty() {
            return Err(FactoryError::EmptyCart);
        }

        let now = Utc::now();
        let batch_id = self.batches.allocate(now).await?;

        let mut moved = Vec::with_capacity(snapshot.len());
        for item in &snapshot {
            match self.batches.adopt_item(&batch_id, item).await {
                Ok(()) => moved.push(item.clone()),
                Err(e) => warn!("⚠️ Leaving {} in the cart: {}", item.id, e),
            }
        }

        let manifest = render_manifest(&batch_id, now, &moved);
        self.batches.store_manifest(&batch_id, &manifest).await?;

        info!("🚀 Launched batch {} with {}/{} items", batch_id, moved.len(), snapshot.len());
        Ok(LaunchReceipt {
            batch_id,
            moved: moved.len(),
            staged: snapshot.len(),
        })
    }
}
