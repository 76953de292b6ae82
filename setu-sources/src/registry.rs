use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use setu_catalog::SourceKind;

use crate::adapter::SourceAdapter;
use crate::error::SourceError;

/// Live registry of connected sources, keyed by catalog `Source::id`.
/// One entry per configured upstream; adapters are swapped wholesale on
/// catalog/config reload rather than mutated in place.
#[derive(Clone, Default)]
pub struct SourcePoolRegistry {
    adapters: Arc<DashMap<String, Arc<dyn SourceAdapter>>>,
}

impl SourcePoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, source_id: impl Into<String>, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(source_id.into(), adapter);
    }

    pub fn get(&self, source_id: &str) -> Result<Arc<dyn SourceAdapter>, SourceError> {
        self.adapters
            .get(source_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| SourceError::NotFound(source_id.to_string()))
    }

    /// Snapshot of every registered `(source_id, adapter)` pair, used by
    /// the scheduler's pool health ticker. Cloned out of the `DashMap`
    /// rather than iterated in place so the caller can `.await` per
    /// adapter without holding a shard lock.
    pub fn all(&self) -> Vec<(String, Arc<dyn SourceAdapter>)> {
        self.adapters
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    pub fn kinds(&self) -> HashMap<String, SourceKind> {
        self.adapters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().kind()))
            .collect()
    }

    pub fn remove(&self, source_id: &str) {
        self.adapters.remove(source_id);
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
