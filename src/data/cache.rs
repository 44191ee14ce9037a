use indexmap::IndexMap;
use log::trace;
use parking_lot::RwLock;

use crate::data::column::Column;

/// Prefix applied to every memoized column name.
pub const MEMO_PREFIX: &str = "_memo_";

/// Derived columns computed at most once per array.
///
/// Arrays which are views of one another (jagged partitions over the same content, clones)
/// share a single cache, and concurrent readers may race to fill an entry. Whichever
/// computation is stored first wins, and every reader sees that value from then on.
#[derive(Debug, Default)]
pub struct MemoCache {
    entries: RwLock<IndexMap<String, Column>>,
}

impl MemoCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        format!("{MEMO_PREFIX}{name}")
    }

    /// The cached value of `name`, if it has been computed.
    pub fn get(&self, name: &str) -> Option<Column> {
        self.entries.read().get(&Self::key(name)).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(&Self::key(name))
    }

    /// Return the cached value of `name`, computing and storing it first if needed.
    ///
    /// The lock is not held while `compute` runs.
    pub fn get_or_compute<F>(&self, name: &str, compute: F) -> Column
    where
        F: FnOnce() -> Column,
    {
        let key = Self::key(name);
        if let Some(column) = self.entries.read().get(&key) {
            trace!("memo hit: {key}");
            return column.clone();
        }
        trace!("memo miss: {key}");
        let column = compute();
        self.entries.write().entry(key).or_insert(column).clone()
    }

    /// Store `column` under `name` unless a value is already present.
    pub fn seed(&self, name: &str, column: Column) {
        self.entries
            .write()
            .entry(Self::key(name))
            .or_insert(column);
    }

    /// Names of the memoized columns, including the prefix, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        thread,
    };

    use super::*;
    use crate::tests::init_logging;

    #[test]
    fn test_computes_once() {
        init_logging();
        let cache = MemoCache::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let column = cache.get_or_compute("pt", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Column::from([1.0, 2.0])
            });
            assert_eq!(column.to_vec(), vec![1.0, 2.0]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.keys(), vec!["_memo_pt".to_string()]);
        assert!(cache.contains("pt"));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_seed_does_not_overwrite() {
        let cache = MemoCache::new();
        cache.seed("eta", Column::from([1.0]));
        cache.seed("eta", Column::from([2.0]));
        assert_eq!(cache.get("eta").unwrap().to_vec(), vec![1.0]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_readers_agree() {
        let cache = Arc::new(MemoCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get_or_compute("phi", || Column::from([i as f64])))
            })
            .collect();
        let results: Vec<Column> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let stored = cache.get("phi").unwrap();
        assert!(results.iter().all(|c| *c == stored));
    }
}
