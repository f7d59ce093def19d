// Path: crates/veris-test-utils/src/state.rs
//! A BTreeMap-backed, byte-lex-ordered `StateAccess` for tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use veris_api::state::{StateAccess, StateScanIter};
use veris_types::error::StateError;

/// Calculates the smallest byte vector that is strictly greater than all keys
/// starting with the given prefix. Returns None if the prefix is all 0xFF bytes.
fn next_prefix(prefix: &[u8]) -> Option<Vec<u8>> {
    if prefix.is_empty() {
        return None;
    }
    let mut ub = prefix.to_vec();
    for i in (0..ub.len()).rev() {
        if let Some(byte) = ub.get_mut(i) {
            if *byte != 0xFF {
                *byte += 1;
                ub.truncate(i + 1);
                return Some(ub);
            }
        }
    }
    None
}

/// An in-memory state backend with the same ordering guarantees as the
/// host's transactional store: prefix scans yield keys in byte-lex order.
#[derive(Debug, Default, Clone)]
pub struct MemoryState {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of stored entries, for assertions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the state holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StateAccess for MemoryState {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.entries.get(key).cloned())
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        self.entries.remove(key);
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError> {
        let upper = next_prefix(prefix);
        let range: Vec<(Arc<[u8]>, Arc<[u8]>)> = match upper {
            Some(upper) => self
                .entries
                .range(prefix.to_vec()..upper)
                .map(|(k, v)| (Arc::from(k.as_slice()), Arc::from(v.as_slice())))
                .collect(),
            None => self
                .entries
                .range(prefix.to_vec()..)
                .map(|(k, v)| (Arc::from(k.as_slice()), Arc::from(v.as_slice())))
                .collect(),
        };
        Ok(Box::new(range.into_iter().map(Ok)))
    }
}
