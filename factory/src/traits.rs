//! Repository and collaborator trait definitions with mockall annotations
//!
//! Persistence and the two quoting collaborators are abstracted behind these
//! traits for dependency injection. The launcher state machine is written
//! against them, so the filesystem substrate can be swapped without touching
//! the lifecycle logic, and the mocks drive the partial-failure tests.

use chrono::{DateTime, Utc};

use crate::error::FactoryResult;
use shared::{BatchDetail, BatchId, BatchSummary, Item, ItemId, PartConfig, Quote};

/// Cart storage abstraction
///
/// Holds not-yet-launched items. Every mutating operation either fully
/// succeeds and returns the new state or fails leaving other records
/// untouched.
#[mockall::automock]
#[async_trait::async_trait]
pub trait ItemRepository: Send + Sync {
    /// Stage a new item: persist the payload first, then its metadata
    /// record, so a concurrent listing never observes metadata without its
    /// payload. Quantity is clamped to at least 1.
    async fn add(
        &self,
        filename: &str,
        payload: Vec<u8>,
        config: PartConfig,
        quantity: u32,
    ) -> FactoryResult<Item>;

    /// All cart items, newest `added_at` first. Corrupt records are skipped,
    /// never fatal.
    async fn list(&self) -> FactoryResult<Vec<Item>>;

    /// Update an item's quantity (clamped to at least 1) under the per-item
    /// lock.
    async fn update_quantity(&self, id: &ItemId, quantity: u32) -> FactoryResult<Item>;

    /// Remove an item's metadata and payload. `ItemNotFound` for unknown
    /// ids; callers treating delete as best-effort may ignore it.
    async fn delete(&self, id: &ItemId) -> FactoryResult<()>;
}

/// Batch storage abstraction
///
/// Batches have fixed membership after creation; only item status flips.
#[mockall::automock]
#[async_trait::async_trait]
pub trait BatchRepository: Send + Sync {
    /// Claim a fresh batch identifier for the given creation time. Two
    /// launches within the identifier's one-second resolution get suffixed
    /// tokens rather than a shared directory.
    async fn allocate(&self, now: DateTime<Utc>) -> FactoryResult<BatchId>;

    /// Move one item's payload and metadata records out of the cart into
    /// the batch. Fails without touching other items.
    async fn adopt_item(&self, batch: &BatchId, item: &Item) -> FactoryResult<()>;

    /// Persist the launch-time manifest text for the batch.
    async fn store_manifest(&self, batch: &BatchId, manifest: &str) -> FactoryResult<()>;

    /// All batches, newest first, each with its status derived by scanning
    /// current item records.
    async fn list_batches(&self) -> FactoryResult<Vec<BatchSummary>>;

    /// Captured manifest plus live item state for one batch.
    async fn get_batch(&self, id: &BatchId) -> FactoryResult<BatchDetail>;

    /// Flip one item to done, stamping `produced_at`. `AlreadyDone` when the
    /// item was produced before; the batch aggregate is never cached, so the
    /// next read reflects the change.
    async fn mark_done(&self, batch: &BatchId, item: &ItemId) -> FactoryResult<Item>;
}

/// Geometry analysis collaborator: mesh bytes in, volume in cm³ out
#[mockall::automock]
pub trait VolumeAnalyzer: Send + Sync {
    fn measure(&self, payload: &[u8]) -> FactoryResult<f64>;
}

/// Pricing collaborator: pure lookup plus arithmetic, no state
#[mockall::automock]
pub trait PriceEstimator: Send + Sync {
    fn estimate(&self, volume_cm3: f64, material: &str, infill: u8) -> FactoryResult<Quote>;
}
