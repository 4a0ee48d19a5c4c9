//! Filesystem cart store
//!
//! One payload plus one metadata record per staged item under `cart/`.
//! Writes go payload first, metadata second, so a concurrent listing never
//! observes a record without its payload; if the metadata write fails the
//! payload is removed again before the error surfaces.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tracing::{info, warn};

use crate::error::{FactoryError, FactoryResult};
use crate::services::layout::{find_metadata_path, StorageLayout};
use crate::services::locks::LockRegistry;
use crate::services::records::{read_record, scan_records, write_record_atomic};
use crate::traits::ItemRepository;
use shared::{Item, ItemId, ItemStatus, PartConfig};

/// Real cart store implementation
#[derive(Clone)]
pub struct FsCartStore {
    layout: StorageLayout,
    locks: Arc<LockRegistry>,
}

impl FsCartStore {
    pub fn new(layout: StorageLayout, locks: Arc<LockRegistry>) -> Self {
        Self { layout, locks }
    }
}

#[async_trait]
impl ItemRepository for FsCartStore {
    async fn add(
        &self,
        filename: &str,
        payload: Vec<u8>,
        config: PartConfig,
        quantity: u32,
    ) -> FactoryResult<Item> {
        let cart_dir = self.layout.cart_dir();
        fs::create_dir_all(&cart_dir)
            .await
            .map_err(|e| FactoryError::storage("create_cart_dir", &cart_dir, e))?;

        let id = ItemId::new();
        let item = Item {
            payload_ref: StorageLayout::payload_ref(&id, filename),
            id,
            filename: filename.to_string(),
            config,
            quantity: quantity.max(1),
            added_at: Utc::now(),
            status: ItemStatus::Pending,
            produced_at: None,
        };

        let payload_path = self.layout.cart_payload_path(&item);
        fs::write(&payload_path, &payload)
            .await
            .map_err(|e| FactoryError::storage("write_payload", &payload_path, e))?;

        let metadata_path = self.layout.cart_metadata_path(&item);
        if let Err(e) = write_record_atomic(&metadata_path, &item).await {
            // No partial record may stay visible: drop the payload again
            let _ = fs::remove_file(&payload_path).await;
            return Err(e);
        }

        info!("🛒 Staged {} (x{}) as {}", item.filename, item.quantity, item.id);
        Ok(item)
    }

    async fn list(&self) -> FactoryResult<Vec<Item>> {
        scan_records(&self.layout.cart_dir()).await
    }

    async fn update_quantity(&self, id: &ItemId, quantity: u32) -> FactoryResult<Item> {
        let _guard = self.locks.acquire(&id.to_string()).await;

        let cart_dir = self.layout.cart_dir();
        let path = find_metadata_path(&cart_dir, id)
            .await
            .map_err(|e| FactoryError::storage("find_record", &cart_dir, e))?
            .ok_or_else(|| FactoryError::item_not_found(id))?;

        let mut item = read_record(&path).await?;
        item.quantity = quantity.max(1);
        write_record_atomic(&path, &item).await?;

        info!("🔢 Quantity of {} set to {}", item.id, item.quantity);
        Ok(item)
    }

    async fn delete(&self, id: &ItemId) -> FactoryResult<()> {
        let _guard = self.locks.acquire(&id.to_string()).await;

        let cart_dir = self.layout.cart_dir();
        let metadata_path = find_metadata_path(&cart_dir, id)
            .await
            .map_err(|e| FactoryError::storage("find_record", &cart_dir, e))?
            .ok_or_else(|| FactoryError::item_not_found(id))?;

        // Metadata first so listings stop showing the item, then the payload
        fs::remove_file(&metadata_path)
            .await
            .map_err(|e| FactoryError::storage("delete_record", &metadata_path, e))?;

        // The payload shares the record's basename without the .json suffix
        let payload_path = metadata_path
            .to_str()
            .and_then(|p| p.strip_suffix(".json"))
            .map(std::path::PathBuf::from);

        if let Some(payload_path) = payload_path {
            match fs::remove_file(&payload_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("⚠️ Payload for {} was already gone", id);
                }
                Err(e) => return Err(FactoryError::storage("delete_payload", &payload_path, e)),
            }
        }

        info!("🗑️ Removed {} from cart", id);
        Ok(())
    }
}
