//! Service implementations
//!
//! Real implementations of the repository and collaborator traits. The
//! stores share one storage layout and one lock registry so per-item
//! serialization holds across cart and batch mutations.

pub mod batch_store;
pub mod cart_store;
pub mod layout;
pub mod locks;
pub mod mesh;
pub mod pricing;
mod records;

// Re-export all service implementations
pub use batch_store::FsBatchStore;
pub use cart_store::FsCartStore;
pub use layout::StorageLayout;
pub use locks::LockRegistry;
pub use mesh::StlVolumeAnalyzer;
pub use pricing::MaterialTable;
