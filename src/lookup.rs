//! Read path: identifier → stored record.
//!
//! The identifier is used verbatim as the store key. Any transport decoding
//! (URL unescaping and the like) happens before [`LookupService::lookup`] is
//! called. Lookups never wait on in-flight ingestion; they see whatever is
//! committed at the time of the call.

use crate::error::ScanError;
use crate::model::PdfMetadataRecord;
use crate::store::MetadataStore;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct LookupService {
    store: Arc<dyn MetadataStore>,
}

impl LookupService {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    /// Fetch the record stored under `id`.
    ///
    /// `Ok(None)` covers both "never submitted" and "still being extracted";
    /// the two are indistinguishable by design of the read path. Only a store
    /// failure is an error.
    pub async fn lookup(&self, id: &str) -> Result<Option<PdfMetadataRecord>, ScanError> {
        info!("Looking up metadata for hash: {}", id);
        let record = self.store.get(id).await?;
        match &record {
            Some(_) => info!("Metadata found for hash: {}", id),
            None => warn!("No metadata found for hash: {}", id),
        }
        Ok(record)
    }
}
