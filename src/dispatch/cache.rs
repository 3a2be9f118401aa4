//! Compiled-template cache keyed by template key

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use crate::template::CompiledTemplate;

/// Attribute tagging every rendered container with its template key
pub const MARKER_ATTR: &str = "data-template-id";

/// Owned copy of the cache contents, ordered by key
pub type CacheSnapshot = BTreeMap<String, CompiledTemplate>;

/// Marker attribute value for a template key
///
/// Double quotes are replaced with single quotes so the value can be used
/// inside a double-quoted attribute selector.
pub fn marker_value(key: &str) -> String {
    key.replace('"', "'")
}

/// Mapping from template key to compiled template
///
/// Holds at most one entry per key. The first successful insert for a key
/// wins; later inserts for a present key are ignored.
#[derive(Debug, Clone, Default)]
pub struct CompiledCache {
    entries: HashMap<String, CompiledTemplate>,
}

impl CompiledCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&CompiledTemplate> {
        self.entries.get(key)
    }

    /// Store `template` unless `key` is already present
    ///
    /// Returns the entry now held for `key`.
    pub fn insert(&mut self, key: &str, template: CompiledTemplate) -> CompiledTemplate {
        self.entries
            .entry(key.to_string())
            .or_insert(template)
            .clone()
    }

    /// Remove the entry for `key`
    pub fn evict(&mut self, key: &str) -> Option<CompiledTemplate> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            trace!(key, "evicted compiled template");
        }
        removed
    }

    /// Remove every entry whose marker value equals `marker`
    ///
    /// Returns the number of evicted entries.
    pub fn evict_marker(&mut self, marker: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| marker_value(key) != marker);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            trace!(marker, evicted, "evicted compiled templates by marker");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// An owned copy of the current contents
    pub fn snapshot(&self) -> CacheSnapshot {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(text: &'static str) -> CompiledTemplate {
        CompiledTemplate::from_fn(move |_| text.to_string())
    }

    #[test]
    fn test_marker_value() {
        assert_eq!(marker_value("#t1"), "#t1");
        assert_eq!(marker_value(r#"[name="row"]"#), "[name='row']");
    }

    #[test]
    fn test_first_writer_wins() {
        let mut cache = CompiledCache::new();
        let first = constant("first");
        cache.insert("#a", first.clone());
        let kept = cache.insert("#a", constant("second"));
        assert!(kept.ptr_eq(&first));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evict() {
        let mut cache = CompiledCache::new();
        cache.insert("#a", constant("a"));
        assert!(cache.evict("#a").is_some());
        assert!(cache.evict("#a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evict_marker_matches_normalized_keys() {
        let mut cache = CompiledCache::new();
        cache.insert(r#"[id="x"]"#, constant("x"));
        cache.insert("#y", constant("y"));
        assert_eq!(cache.evict_marker("[id='x']"), 1);
        assert!(!cache.contains(r#"[id="x"]"#));
        assert!(cache.contains("#y"));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut cache = CompiledCache::new();
        cache.insert("#a", constant("a"));
        let mut snapshot = cache.snapshot();
        snapshot.clear();
        snapshot.insert("#b".to_string(), constant("b"));
        assert!(cache.contains("#a"));
        assert!(!cache.contains("#b"));
    }
}
