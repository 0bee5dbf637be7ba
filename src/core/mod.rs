//! Core utilities shared by the commands
//!
//! - `cache`: two-tier raw payload cache and file helpers

pub mod cache;

pub use cache::{default_cache_dir, CacheKey, PayloadCache, PayloadCacheKey, UnifiedCache};
