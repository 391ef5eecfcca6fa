//! Core services
//!
//! - `TtlStore`: bounded key/value store with per-store expiry
//! - `GroupCache`: read-through group hierarchy cache built on `TtlStore`

mod group_cache;
mod ttl_store;

pub use group_cache::{GroupCache, GroupCacheStats};
pub use ttl_store::TtlStore;
