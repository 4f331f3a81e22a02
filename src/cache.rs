use crate::{NodeId, Subtree};
use std::collections::HashMap;

/// An entry in the [`NodeCache`]: the subtree, holding every page loaded so far, and the number
/// of the last page it holds.
#[derive(
    Debug,
    Clone,
    PartialEq,
    derive_new::new,
    derive_getters::Getters,
    derive_getters::Dissolve,
)]
pub struct Entry {
    subtree: Subtree,
    page: u32,
}

/// The `NodeCache` remembers every subtree we have fetched, keyed by node id.
///
/// There is no eviction and no expiry.  The store grows until somebody calls
/// [`NodeCache::delete_all`].  Each entry remembers how many pages it holds, so a column rebuilt
/// from the cache picks up paging where it left off.
///
/// The cache keeps count of reads and writes.  Filtered views must never touch the cache, and the
/// counters make that easy to check.
#[derive(Debug, Default, derive_getters::Getters)]
pub struct NodeCache {
    #[getter(skip)]
    entries: HashMap<NodeId, Entry>,
    reads: usize,
    writes: usize,
}

impl NodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `subtree`, loaded up to `page`, under `key`, replacing anything already there.
    pub fn put(&mut self, key: NodeId, subtree: Subtree, page: u32) {
        self.writes += 1;
        tracing::trace!("Caching subtree for {key} through page {page}.");
        self.entries.insert(key, Entry::new(subtree, page));
    }

    /// Returns a copy of the entry stored under `key`, if any.
    pub fn get(&mut self, key: &NodeId) -> Option<Entry> {
        self.reads += 1;
        let hit = self.entries.get(key).cloned();
        tracing::trace!("Cache {} for {key}.", if hit.is_some() { "hit" } else { "miss" });
        hit
    }

    pub fn contains(&self, key: &NodeId) -> bool {
        self.entries.contains_key(key)
    }

    /// Cached keys, sorted.
    pub fn keys(&self) -> Vec<NodeId> {
        let mut keys = self.entries.keys().cloned().collect::<Vec<NodeId>>();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empties the store.
    #[tracing::instrument(skip_all)]
    pub fn delete_all(&mut self) {
        tracing::debug!("Dropping {} cached subtrees.", self.entries.len());
        self.entries.clear();
    }

    /// Releases the store for good.
    #[tracing::instrument(skip_all)]
    pub fn destroy(self) {
        tracing::debug!(
            "Cache destroyed after {} reads and {} writes, {} entries left.",
            self.reads,
            self.writes,
            self.entries.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Node;
    use proptest::prelude::*;

    fn subtree(id: &str, children: &[&str]) -> Subtree {
        let children = children
            .iter()
            .map(|child| Node::new((*child).into(), None, None, None))
            .collect();
        Subtree::new(Node::new(id.into(), None, None, None), Some(Node::root()), children, false)
    }

    #[test]
    fn put_overwrites() {
        let mut cache = NodeCache::new();
        cache.put("a".into(), subtree("a", &["x"]), 1);
        cache.put("a".into(), subtree("a", &["y", "z"]), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get(&"a".into()),
            Some(Entry::new(subtree("a", &["y", "z"]), 2))
        );
        assert_eq!(*cache.writes(), 2);
        assert_eq!(*cache.reads(), 1);
    }

    #[test]
    fn delete_all_empties_the_store() {
        let mut cache = NodeCache::new();
        cache.put("a".into(), subtree("a", &[]), 1);
        cache.put("b".into(), subtree("b", &[]), 1);
        assert_eq!(cache.keys(), vec![NodeId::from("a"), NodeId::from("b")]);
        cache.delete_all();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a".into()), None);
        assert!(!cache.contains(&"b".into()));
    }

    proptest! {
        #[test]
        fn get_returns_the_last_put(ops in prop::collection::vec((0u8..6, 0u8..4), 1..40)) {
            let mut cache = NodeCache::new();
            let mut expected = HashMap::new();
            for (key, width) in ops {
                let key = NodeId::from(key.to_string());
                let names = (0..width).map(|i| i.to_string()).collect::<Vec<_>>();
                let names = names.iter().map(String::as_str).collect::<Vec<_>>();
                let value = subtree(&key, &names);
                cache.put(key.clone(), value.clone(), u32::from(width) + 1);
                expected.insert(key, Entry::new(value, u32::from(width) + 1));
            }
            for (key, value) in expected {
                prop_assert_eq!(cache.get(&key), Some(value));
            }
        }
    }
}
