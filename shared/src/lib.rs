//! Shared types for the fabrication backend
//!
//! Contains the domain types exchanged between the factory engine and the
//! webserver transport. Component-internal types stay in their respective
//! crates.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
