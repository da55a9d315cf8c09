//! Local caching for offline display.
//!
//! Courses, materials, progress and certificates are stored as JSON with a
//! timestamp and considered stale after 60 minutes.

pub mod manager;

pub use manager::{CacheManager, CachedData};
