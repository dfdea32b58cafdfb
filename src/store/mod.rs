//! Backing document stores.

pub mod memory;

#[cfg(feature = "postgres-store")]
pub mod postgres;

mod store_trait;
pub use store_trait::*;
