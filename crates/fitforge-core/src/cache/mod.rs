//! Two-tier cache facade and its typed veneer (spec §4.1, §4.2).

pub mod facade;
pub mod fallback;
pub mod key;
pub mod typed_store;

pub use facade::{CacheConfig, IndexedCacheFacade};
pub use typed_store::TypedCacheStore;
