//! Pure lifecycle logic
//!
//! Status derivation and manifest rendering have no I/O of their own; the
//! stores and the launcher call into them.

pub mod manifest;
pub mod status;

pub use manifest::render_manifest;
pub use status::derive_batch_status;
