use async_trait::async_trait;
use dashmap::DashMap;

use super::MetadataStore;
use crate::error::StoreError;
use crate::model::PdfMetadataRecord;

/// In-memory [`MetadataStore`] backed by a [`DashMap`].
///
/// Fully synchronous internally; the async trait methods return immediately.
/// Writes to the same key are serialised by the map's shard lock.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: DashMap<String, PdfMetadataRecord>,
}

impl MemoryMetadataStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn put(&self, record: PdfMetadataRecord) -> Result<(), StoreError> {
        let key = record.content_identifier.as_str().to_owned();
        self.records.insert(key, record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<PdfMetadataRecord>, StoreError> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    async fn contains(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.records.contains_key(id))
    }
}
