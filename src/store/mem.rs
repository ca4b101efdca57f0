//! In-memory holon store backed by DashMap.
//!
//! Used when no durable store is configured and throughout the tests. All
//! data is lost on process exit.

use dashmap::DashMap;

use crate::error::StoreError;
use crate::holon::{HolonRecord, Layer, LayerCount};

use super::{HolonStore, StoreResult};

/// Concurrent in-memory store using a sharded hashmap.
#[derive(Debug, Default)]
pub struct MemHolonStore {
    data: DashMap<String, HolonRecord>,
}

impl MemHolonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub fn put(&self, record: HolonRecord) {
        self.data.insert(record.id.clone(), record);
    }

    /// Move a holon to another layer. Returns whether it existed.
    pub fn set_layer(&self, id: &str, layer: Layer) -> bool {
        match self.data.get_mut(id) {
            Some(mut entry) => {
                entry.layer = layer;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &str) -> Option<HolonRecord> {
        self.data.remove(id).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl HolonStore for MemHolonStore {
    fn get_holon(&self, id: &str) -> StoreResult<HolonRecord> {
        self.data
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound { id: id.into() })
    }

    fn count_holons_by_layer(&self, context_id: &str) -> StoreResult<Vec<LayerCount>> {
        let snapshot: Vec<HolonRecord> = self.data.iter().map(|e| e.value().clone()).collect();
        Ok(super::tally(&snapshot, context_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holon::Category;

    #[test]
    fn put_get_and_promote() {
        let store = MemHolonStore::new();
        store.put(HolonRecord::hypothesis("h1", Category::System, "T", "C"));
        assert_eq!(store.get_holon("h1").unwrap().layer, Layer::L0);

        assert!(store.set_layer("h1", Layer::L1));
        assert_eq!(store.get_holon("h1").unwrap().layer, Layer::L1);
        assert!(!store.set_layer("ghost", Layer::L1));
    }

    #[test]
    fn missing_holon_is_not_found() {
        let store = MemHolonStore::new();
        assert!(matches!(
            store.get_holon("ghost"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn counts_empty_store() {
        let store = MemHolonStore::new();
        assert!(store.count_holons_by_layer("default").unwrap().is_empty());
        assert!(store.is_empty());
    }
}
