//! Caching of class probe results

pub mod probe_cache;

// Re-export the main cache type
pub use probe_cache::ProbeCache;
