//! Filesystem batch store
//!
//! One directory per batch under `production/`, holding the payload and
//! metadata pairs moved out of the cart plus the launch-time manifest.
//! Batch membership never changes after launch; only item status flips, and
//! the aggregate status is derived from the records on every read.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{info, warn};

use crate::core::derive_batch_status;
use crate::error::{FactoryError, FactoryResult};
use crate::services::layout::{find_metadata_path, StorageLayout};
use crate::services::locks::LockRegistry;
use crate::services::records::{read_record, scan_records, write_record_atomic};
use crate::traits::BatchRepository;
use shared::{BatchDetail, BatchId, BatchSummary, Item, ItemId, ItemStatus};

/// Upper bound on same-second launch attempts before giving up
const MAX_ALLOCATE_ATTEMPTS: u32 = 128;

/// Real batch store implementation
#[derive(Clone)]
pub struct FsBatchStore {
    layout: StorageLayout,
    locks: Arc<LockRegistry>,
}

impl FsBatchStore {
    pub fn new(layout: StorageLayout, locks: Arc<LockRegistry>) -> Self {
        Self { layout, locks }
    }

    async fn require_batch_dir(&self, id: &BatchId) -> FactoryResult<std::path::PathBuf> {
        let dir = self.layout.batch_dir(id);
        match fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(FactoryError::batch_not_found(id)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FactoryError::batch_not_found(id))
            }
            Err(e) => Err(FactoryError::storage("stat_batch", &dir, e)),
        }
    }
}

#[async_trait]
impl BatchRepository for FsBatchStore {
    async fn allocate(&self, now: DateTime<Utc>) -> FactoryResult<BatchId> {
        let production = self.layout.production_dir();
        fs::create_dir_all(&production)
            .await
            .map_err(|e| FactoryError::storage("create_production_dir", &production, e))?;

        // create_dir claims the identifier atomically; a same-second launch
        // sees AlreadyExists and retries with the next suffix
        for attempt in 1..=MAX_ALLOCATE_ATTEMPTS {
            let id = BatchId::from_timestamp(now, attempt);
            let dir = self.layout.batch_dir(&id);
            match fs::create_dir(&dir).await {
                Ok(()) => {
                    info!("📦 Allocated batch {}", id);
                    return Ok(id);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(FactoryError::storage("allocate_batch", &dir, e)),
            }
        }

        let dir = self.layout.batch_dir(&BatchId::from_timestamp(now, MAX_ALLOCATE_ATTEMPTS));
        Err(FactoryError::storage(
            "allocate_batch",
            &dir,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "identifier space exhausted"),
        ))
    }

    async fn adopt_item(&self, batch: &BatchId, item: &Item) -> FactoryResult<()> {
        let src_payload = self.layout.cart_payload_path(item);
        let dst_payload = self.layout.batch_payload_path(batch, item);
        fs::rename(&src_payload, &dst_payload)
            .await
            .map_err(|e| FactoryError::storage("move_payload", &src_payload, e))?;

        // Payload first, metadata second: the batch listing only shows the
        // item once its payload is already in place
        let src_metadata = self.layout.cart_metadata_path(item);
        let dst_metadata = self.layout.batch_metadata_path(batch, item);
        if let Err(e) = fs::rename(&src_metadata, &dst_metadata).await {
            if fs::rename(&dst_payload, &src_payload).await.is_err() {
                warn!("⚠️ Could not return payload of {} to the cart", item.id);
            }
            return Err(FactoryError::storage("move_record", &src_metadata, e));
        }

        Ok(())
    }

    async fn store_manifest(&self, batch: &BatchId, manifest: &str) -> FactoryResult<()> {
        let path = self.layout.manifest_path(batch);
        fs::write(&path, manifest)
            .await
            .map_err(|e| FactoryError::storage("write_manifest", &path, e))
    }

    async fn list_batches(&self) -> FactoryResult<Vec<BatchSummary>> {
        let production = self.layout.production_dir();
        let mut entries = match fs::read_dir(&production).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(FactoryError::storage("list_batches", &production, e)),
        };

        let mut summaries = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => return Err(FactoryError::storage("list_batches", &production, e)),
            };

            let file_type = entry
                .file_type()
                .await
                .map_err(|e| FactoryError::storage("list_batches", entry.path(), e))?;
            if !file_type.is_dir() {
                continue;
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let id = match BatchId::parse(name) {
                Ok(id) => id,
                Err(_) => {
                    warn!("⚠️ Skipping foreign directory in production root: {}", name);
                    continue;
                }
            };

            let items = scan_records(&entry.path()).await?;
            let statuses: Vec<ItemStatus> = items.iter().map(|i| i.status).collect();
            summaries.push(BatchSummary {
                id,
                status: derive_batch_status(&statuses),
                item_count: items.len(),
            });
        }

        summaries.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(summaries)
    }

    async fn get_batch(&self, id: &BatchId) -> FactoryResult<BatchDetail> {
        let dir = self.require_batch_dir(id).await?;

        let manifest_path = self.layout.manifest_path(id);
        let manifest = match fs::read_to_string(&manifest_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("⚠️ Batch {} has no manifest", id);
                String::new()
            }
            Err(e) => return Err(FactoryError::storage("read_manifest", &manifest_path, e)),
        };

        let items = scan_records(&dir).await?;
        let statuses: Vec<ItemStatus> = items.iter().map(|i| i.status).collect();

        Ok(BatchDetail {
            id: id.clone(),
            status: derive_batch_status(&statuses),
            manifest,
            items,
        })
    }

    async fn mark_done(&self, batch: &BatchId, item: &ItemId) -> FactoryResult<Item> {
        let dir = self.require_batch_dir(batch).await?;

        let _guard = self.locks.acquire(&item.to_string()).await;

        let path = find_metadata_path(&dir, item)
            .await
            .map_err(|e| FactoryError::storage("find_record", &dir, e))?
            .ok_or_else(|| FactoryError::item_not_found(item))?;

        let mut record = read_record(&path).await?;
        if record.is_done() {
            return Err(FactoryError::AlreadyDone { id: item.to_string() });
        }

        record.status = ItemStatus::Done;
        record.produced_at = Some(Utc::now());
        write_record_atomic(&path, &record).await?;

        info!("✅ Marked {} as produced in batch {}", item, batch);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cart_store::FsCartStore;
    use crate::traits::ItemRepository;
    use shared::{BatchStatus, PartConfig};
    use tempfile::TempDir;

    fn create_test_stores() -> (FsCartStore, FsBatchStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let layout = StorageLayout::new(temp.path());
        let locks = Arc::new(LockRegistry::new());
        let cart = FsCartStore::new(layout.clone(), locks.clone());
        let batches = FsBatchStore::new(layout, locks);
        (cart, batches, temp)
    }

    async fn staged_item(cart: &FsCartStore, filename: &str, quantity: u32) -> Item {
        cart.add(filename, b"mesh".to_vec(), PartConfig::filament("PLA", 20), quantity)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn allocate_suffixes_same_second_collisions() {
        let (_cart, batches, _temp) = create_test_stores();
        let now = Utc::now();

        let first = batches.allocate(now).await.unwrap();
        let second = batches.allocate(now).await.unwrap();

        assert_ne!(first, second);
        assert!(second.as_str().starts_with(first.as_str()));
        assert!(second.as_str().ends_with("_2"));
    }

    #[tokio::test]
    async fn adopt_moves_payload_and_record() {
        let (cart, batches, temp) = create_test_stores();
        let item = staged_item(&cart, "part.stl", 1).await;

        let batch = batches.allocate(Utc::now()).await.unwrap();
        batches.adopt_item(&batch, &item).await.unwrap();

        assert!(cart.list().await.unwrap().is_empty());
        let batch_dir = temp.path().join("production").join(batch.as_str());
        assert!(batch_dir.join(&item.payload_ref).exists());
        assert!(batch_dir.join(format!("{}.json", item.payload_ref)).exists());
    }

    #[tokio::test]
    async fn get_batch_returns_manifest_unchanged() {
        let (cart, batches, _temp) = create_test_stores();
        let item = staged_item(&cart, "part.stl", 1).await;

        let batch = batches.allocate(Utc::now()).await.unwrap();
        batches.adopt_item(&batch, &item).await.unwrap();
        batches.store_manifest(&batch, "the manifest\n").await.unwrap();

        let first = batches.get_batch(&batch).await.unwrap();
        let second = batches.get_batch(&batch).await.unwrap();
        assert_eq!(first.manifest, "the manifest\n");
        assert_eq!(first.manifest, second.manifest);
        assert_eq!(first.items.len(), 1);
    }

    #[tokio::test]
    async fn get_unknown_batch_is_not_found() {
        let (_cart, batches, _temp) = create_test_stores();
        let id = BatchId::parse("2026-01-01_00-00-00").unwrap();

        let result = batches.get_batch(&id).await;
        assert!(matches!(result, Err(FactoryError::BatchNotFound { .. })));
    }

    #[tokio::test]
    async fn mark_done_flips_status_once() {
        let (cart, batches, _temp) = create_test_stores();
        let item = staged_item(&cart, "part.stl", 1).await;
        let batch = batches.allocate(Utc::now()).await.unwrap();
        batches.adopt_item(&batch, &item).await.unwrap();

        let done = batches.mark_done(&batch, &item.id).await.unwrap();
        assert_eq!(done.status, ItemStatus::Done);
        assert!(done.produced_at.is_some());

        let again = batches.mark_done(&batch, &item.id).await;
        assert!(matches!(again, Err(FactoryError::AlreadyDone { .. })));
    }

    #[tokio::test]
    async fn mark_done_reports_missing_batch_and_item() {
        let (cart, batches, _temp) = create_test_stores();

        let missing_batch = BatchId::parse("2026-01-01_00-00-00").unwrap();
        let result = batches.mark_done(&missing_batch, &ItemId::new()).await;
        assert!(matches!(result, Err(FactoryError::BatchNotFound { .. })));

        let item = staged_item(&cart, "part.stl", 1).await;
        let batch = batches.allocate(Utc::now()).await.unwrap();
        batches.adopt_item(&batch, &item).await.unwrap();
        let result = batches.mark_done(&batch, &ItemId::new()).await;
        assert!(matches!(result, Err(FactoryError::ItemNotFound { .. })));
    }

    #[tokio::test]
    async fn batch_status_follows_item_completion() {
        let (cart, batches, _temp) = create_test_stores();
        let first = staged_item(&cart, "a.stl", 1).await;
        let second = staged_item(&cart, "b.stl", 2).await;

        let batch = batches.allocate(Utc::now()).await.unwrap();
        batches.adopt_item(&batch, &first).await.unwrap();
        batches.adopt_item(&batch, &second).await.unwrap();

        assert_eq!(batches.get_batch(&batch).await.unwrap().status, BatchStatus::Pending);

        batches.mark_done(&batch, &first.id).await.unwrap();
        assert_eq!(batches.get_batch(&batch).await.unwrap().status, BatchStatus::InProgress);

        batches.mark_done(&batch, &second.id).await.unwrap();
        assert_eq!(batches.get_batch(&batch).await.unwrap().status, BatchStatus::Completed);
    }

    #[tokio::test]
    async fn list_batches_orders_newest_first() {
        let (_cart, batches, _temp) = create_test_stores();

        let older = "2026-01-01T00:00:00Z".parse().unwrap();
        let newer = "2026-06-01T00:00:00Z".parse().unwrap();
        batches.allocate(older).await.unwrap();
        batches.allocate(newer).await.unwrap();

        let summaries = batches.list_batches().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert!(summaries[0].id > summaries[1].id);
        assert_eq!(summaries[0].status, BatchStatus::Empty);
    }
}
