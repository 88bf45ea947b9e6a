//! # pdf-metadata-scanner
//!
//! Content-addressed ingestion and lookup of PDF document metadata.
//!
//! A submitted document is identified by the SHA-256 of its bytes. The
//! identifier is returned immediately; metadata (header version, producer,
//! author, creation and modification dates) is extracted in the background
//! and stored under that identifier, where lookups can find it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! bytes + filename
//!  │
//!  ├─ 1. Validate  non-empty payload, ".pdf" suffix          (synchronous)
//!  ├─ 2. Hash      SHA-256 → Base64 (or hex) identifier      (synchronous, returned)
//!  ├─ 3. Name      <stem>_<unix-millis>.pdf
//!  ├─ 4. Extract   lopdf / pdfium on the blocking pool       (background)
//!  └─ 5. Store     upsert keyed by identifier                (background)
//!
//! lookup(identifier) ──▶ store.get ──▶ record | not found
//! ```
//!
//! Between steps 2 and 5 a lookup reports not-found. Background failures are
//! never silent: each submission emits one [`IngestEvent`], and
//! [`IngestionPipeline::submit_tracked`] hands back a [`Receipt`] to await.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_metadata_scanner::{
//!     IngestionPipeline, LookupService, LopdfExtractor, MemoryMetadataStore, ScannerConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryMetadataStore::new());
//!     let pipeline = IngestionPipeline::new(
//!         ScannerConfig::default(),
//!         Arc::new(LopdfExtractor::new()),
//!         store.clone(),
//!     )?;
//!
//!     let bytes = std::fs::read("report.pdf")?;
//!     let receipt = pipeline.submit_tracked(bytes, "report.pdf")?;
//!     let id = receipt.id().clone();
//!     receipt.wait().await?;
//!
//!     let record = LookupService::new(store).lookup(id.as_str()).await?;
//!     println!("{:#?}", record);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | The `pdfscan` binary (clap + anyhow + tracing-subscriber); implies `server` |
//! | `sqlite` | on      | [`SqliteMetadataStore`] via rusqlite (bundled SQLite) |
//! | `server` | via cli | axum HTTP surface: `POST /scan`, `GET /lookup/{hash}`, `GET /health` |
//! | `pdfium` | off     | [`PdfiumExtractor`], reading metadata through libpdfium |
//!
//! Library-only use:
//! ```toml
//! pdf-metadata-scanner = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod hash;
pub mod ingest;
pub mod lookup;
pub mod model;
#[cfg(feature = "server")]
pub mod server;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ScannerConfig, ScannerConfigBuilder};
pub use error::{IngestError, MalformedDocumentError, ScanError, StoreError};
pub use extract::{LopdfExtractor, MetadataExtractor};
#[cfg(feature = "pdfium")]
pub use extract::PdfiumExtractor;
pub use hash::{ContentHasher, IdentifierEncoding, Sha256Hasher};
pub use ingest::{IngestEvent, IngestOutcome, IngestStats, IngestionPipeline, Receipt};
pub use lookup::LookupService;
pub use model::{ContentIdentifier, ExtractedMetadata, PdfMetadataRecord, SubmissionName};
pub use store::{MemoryMetadataStore, MetadataStore};
#[cfg(feature = "sqlite")]
pub use store::SqliteMetadataStore;
