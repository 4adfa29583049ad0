//! Per-build chart cache.
//!
//! Maps `(chart name, chart version)` to the resolved on-disk path.
//! Scoped to one plan builder invocation: constructed at the start of
//! a build, shared across concurrent release resolutions, discarded
//! when the build finishes. The lock guards only the map reads and
//! writes, never the resolution I/O itself, so two releases missing
//! on the same key may both resolve; the result is idempotent and the
//! last write wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Cache of resolved chart paths for one build run.
#[derive(Debug, Default)]
pub struct ChartCache {
    entries: Mutex<HashMap<(String, String), PathBuf>>,
}

impl ChartCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the resolved path for `(name, version)`.
    #[must_use]
    pub fn get(&self, name: &str, version: &str) -> Option<PathBuf> {
        let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.get(&(name.to_string(), version.to_string())).cloned()
    }

    /// Stores the resolved path for `(name, version)`.
    pub fn insert(&self, name: &str, version: &str, path: &Path) {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert((name.to_string(), version.to_string()), path.to_path_buf());
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.len()
    }

    /// Returns true if nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get() {
        let cache = ChartCache::new();
        assert!(cache.get("nginx", "1.0").is_none());

        cache.insert("nginx", "1.0", Path::new("/tmp/nginx-1.0.tgz"));
        assert_eq!(
            cache.get("nginx", "1.0"),
            Some(PathBuf::from("/tmp/nginx-1.0.tgz"))
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn versions_are_distinct_keys() {
        let cache = ChartCache::new();
        cache.insert("nginx", "1.0", Path::new("/tmp/nginx-1.0.tgz"));
        cache.insert("nginx", "2.0", Path::new("/tmp/nginx-2.0.tgz"));

        assert_eq!(cache.len(), 2);
        assert_eq!(
            cache.get("nginx", "2.0"),
            Some(PathBuf::from("/tmp/nginx-2.0.tgz"))
        );
    }

    #[test]
    fn concurrent_inserts_on_same_key_keep_map_intact() {
        let cache = std::sync::Arc::new(ChartCache::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = std::sync::Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.insert("nginx", "1.0", Path::new("/tmp/nginx-1.0.tgz"));
                    cache.insert(&format!("chart-{i}"), "", Path::new("/tmp/other"));
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread panicked");
        }

        // One shared key plus one key per thread.
        assert_eq!(cache.len(), 9);
        assert_eq!(
            cache.get("nginx", "1.0"),
            Some(PathBuf::from("/tmp/nginx-1.0.tgz"))
        );
    }
}
