//! Metadata persistence keyed by [`ContentIdentifier`].
//!
//! Backends:
//!
//! * [`MemoryMetadataStore`]: `DashMap`, process lifetime only.
//! * [`SqliteMetadataStore`]: single SQLite file (feature `sqlite`).
//!
//! Every backend replaces a record atomically: a concurrent `get` sees either
//! the previous record or the new one, never a mix of fields.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryMetadataStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteMetadataStore;

use crate::error::StoreError;
use crate::model::PdfMetadataRecord;
use async_trait::async_trait;

/// Key-value persistence for [`PdfMetadataRecord`]s.
///
/// Implementations must be `Send + Sync` and safe for concurrent access from
/// ingestion workers and lookups.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Upsert `record` under `record.content_identifier`, replacing any
    /// previous record for that identifier.
    async fn put(&self, record: PdfMetadataRecord) -> Result<(), StoreError>;

    /// Fetch the record stored under `id`. `Ok(None)` if absent.
    async fn get(&self, id: &str) -> Result<Option<PdfMetadataRecord>, StoreError>;

    /// Whether a record exists under `id`.
    async fn contains(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.get(id).await?.is_some())
    }
}
