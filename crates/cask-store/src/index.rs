//! In-memory transfer index

use std::collections::HashSet;
use std::sync::Mutex;

use cask_core::{CaskResult, Index, Key};

/// Membership set over a hash table, populated from a remote enumeration or
/// built incrementally.
#[derive(Debug, Default)]
pub struct MemIndex {
    keys: Mutex<HashSet<Key>>,
}

impl MemIndex {
    pub fn new() -> MemIndex {
        MemIndex::default()
    }

    pub fn len(&self) -> usize {
        self.keys.lock().expect("index lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Index for MemIndex {
    fn has(&self, key: &Key) -> bool {
        self.keys.lock().expect("index lock poisoned").contains(key)
    }

    fn add(&self, key: Key) -> CaskResult<()> {
        self.keys.lock().expect("index lock poisoned").insert(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cask_core::IndexSink;
    use cask_core::KeyWrite;

    #[test]
    fn add_then_has() {
        let index = MemIndex::new();
        let key = Key::of(b"present");
        assert!(!index.has(&key));
        index.add(key).unwrap();
        assert!(index.has(&key));
        assert!(!index.has(&Key::of(b"absent")));
    }

    #[test]
    fn adds_are_unique() {
        let index = MemIndex::new();
        let key = Key::of(b"dup");
        index.add(key).unwrap();
        index.add(key).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn index_sink_feeds_the_index() {
        let index = MemIndex::new();
        let mut sink = IndexSink(&index);
        sink.write_key(Key::of(b"via sink")).unwrap();
        assert!(index.has(&Key::of(b"via sink")));
    }
}
