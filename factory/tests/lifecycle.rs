//! End-to-end lifecycle tests against the real filesystem stores
//!
//! Exercises the full path a job takes: staged in the cart, launched into a
//! batch, worked to completion by the operator.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use factory::services::{FsBatchStore, FsCartStore, LockRegistry, StorageLayout};
use factory::{BatchRepository, FactoryError, ItemRepository, Launcher};
use shared::{BatchStatus, Item, ItemStatus, PartConfig};

struct TestRig {
    cart: FsCartStore,
    batches: FsBatchStore,
    launcher: Launcher<FsCartStore, FsBatchStore>,
    _temp: TempDir,
}

fn setup() -> TestRig {
    let temp = TempDir::new().unwrap();
    let layout = StorageLayout::new(temp.path());
    let locks = Arc::new(LockRegistry::new());
    let cart = FsCartStore::new(layout.clone(), locks.clone());
    let batches = FsBatchStore::new(layout, locks);
    let launcher = Launcher::new(cart.clone(), batches.clone());

    TestRig { cart, batches, launcher, _temp: temp }
}

async fn stage(cart: &FsCartStore, filename: &str, quantity: u32) -> Item {
    // Spaced out so added_at ordering is deterministic
    tokio::time::sleep(Duration::from_millis(5)).await;
    cart.add(filename, b"mesh-bytes".to_vec(), PartConfig::filament("PLA", 30), quantity)
        .await
        .unwrap()
}

#[tokio::test]
async fn full_production_cycle() {
    let rig = setup();

    let item_a = stage(&rig.cart, "a.stl", 1).await;
    let item_b = stage(&rig.cart, "b.stl", 2).await;

    let receipt = rig.launcher.launch().await.unwrap();
    assert_eq!(receipt.moved, 2);
    assert_eq!(receipt.staged, 2);

    // The cart is drained, the batch holds both items
    assert!(rig.cart.list().await.unwrap().is_empty());
    let summaries = rig.batches.list_batches().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].item_count, 2);
    assert_eq!(summaries[0].status, BatchStatus::Pending);

    let detail = rig.batches.get_batch(&receipt.batch_id).await.unwrap();
    assert!(detail.manifest.contains("#1  b.stl"));
    assert!(detail.manifest.contains("#2  a.stl"));
    assert!(detail.manifest.contains("Total parts: 3"));

    // Work the batch to completion
    let done_a = rig.batches.mark_done(&receipt.batch_id, &item_a.id).await.unwrap();
    assert_eq!(done_a.status, ItemStatus::Done);
    assert!(done_a.produced_at.is_some());
    assert_eq!(
        rig.batches.get_batch(&receipt.batch_id).await.unwrap().status,
        BatchStatus::InProgress
    );

    rig.batches.mark_done(&receipt.batch_id, &item_b.id).await.unwrap();
    assert_eq!(
        rig.batches.get_batch(&receipt.batch_id).await.unwrap().status,
        BatchStatus::Completed
    );
}

#[tokio::test]
async fn launch_on_empty_cart_changes_nothing() {
    let rig = setup();

    let result = rig.launcher.launch().await;
    assert!(matches!(result, Err(FactoryError::EmptyCart)));
    assert!(rig.batches.list_batches().await.unwrap().is_empty());
}

#[tokio::test]
async fn successive_launches_build_separate_batches() {
    let rig = setup();

    stage(&rig.cart, "first.stl", 1).await;
    let first = rig.launcher.launch().await.unwrap();

    stage(&rig.cart, "second.stl", 1).await;
    let second = rig.launcher.launch().await.unwrap();

    assert_ne!(first.batch_id, second.batch_id);

    let summaries = rig.batches.list_batches().await.unwrap();
    assert_eq!(summaries.len(), 2);
    // Newest batch first
    assert_eq!(summaries[0].id, second.batch_id);

    // Membership is fixed: the first batch never picked up the later item
    let detail = rig.batches.get_batch(&first.batch_id).await.unwrap();
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].filename, "first.stl");
}

#[tokio::test]
async fn manifest_survives_item_mutation() {
    let rig = setup();

    let item = stage(&rig.cart, "part.stl", 1).await;
    let receipt = rig.launcher.launch().await.unwrap();

    let before = rig.batches.get_batch(&receipt.batch_id).await.unwrap().manifest;
    rig.batches.mark_done(&receipt.batch_id, &item.id).await.unwrap();
    let after = rig.batches.get_batch(&receipt.batch_id).await.unwrap().manifest;

    // The manifest is the launch snapshot, not live state
    assert_eq!(before, after);
}

#[tokio::test]
async fn quantity_update_and_delete_stay_in_the_cart() {
    let rig = setup();

    let keep = stage(&rig.cart, "keep.stl", 1).await;
    let discard = stage(&rig.cart, "discard.stl", 1).await;

    rig.cart.update_quantity(&keep.id, 7).await.unwrap();
    rig.cart.delete(&discard.id).await.unwrap();

    let items = rig.cart.list().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, keep.id);
    assert_eq!(items[0].quantity, 7);
}
