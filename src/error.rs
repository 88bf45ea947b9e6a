//! Error types for the pdf-metadata-scanner library.
//!
//! Errors are split by *when* the caller learns about them:
//!
//! * [`ScanError`]: **synchronous**, returned directly from
//!   [`crate::ingest::IngestionPipeline::submit`] and
//!   [`crate::lookup::LookupService::lookup`]. Caller-input errors in this
//!   enum guarantee that no state was touched.
//!
//! * [`IngestError`]: **asynchronous**, a single submission failed after its
//!   identifier was already issued (unparseable document, store outage,
//!   timeout). Delivered through the pipeline's failure channel, never as a
//!   return value, and never affects other submissions.
//!
//! The two capability errors, [`MalformedDocumentError`] and [`StoreError`],
//! are produced by extractors and stores respectively and wrapped by the
//! enums above depending on the path they surface on.

use thiserror::Error;

/// All errors reported synchronously by the pipeline and lookup service.
#[derive(Debug, Error)]
pub enum ScanError {
    // ── Caller input errors ───────────────────────────────────────────────
    /// The submitted payload contained no bytes.
    #[error("File is empty")]
    EmptyPayload,

    /// The submitted filename does not carry a `.pdf` suffix.
    #[error("Invalid file type: '{filename}' does not end in .pdf")]
    InvalidFileType { filename: String },

    /// A lookup identifier could not be decoded from its transport encoding.
    #[error("Invalid hash format '{input}': {reason}")]
    MalformedIdentifier { input: String, reason: String },

    // ── Capability errors ─────────────────────────────────────────────────
    /// The metadata store could not complete a read or write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The configured extractor backend could not be initialised.
    #[error("Metadata extractor unavailable: {0}")]
    ExtractorUnavailable(String),

    // ── Lifecycle errors ──────────────────────────────────────────────────
    /// The pipeline has been shut down and accepts no more submissions.
    #[error("Ingestion pipeline is shut down")]
    PipelineClosed,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScanError {
    /// `true` for the caller-input class: the request itself was wrong and
    /// retrying it unchanged will fail again.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ScanError::EmptyPayload
                | ScanError::InvalidFileType { .. }
                | ScanError::MalformedIdentifier { .. }
        )
    }
}

/// The extractor could not parse the bytes as a structurally valid PDF.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedDocumentError {
    /// The payload does not start with the `%PDF` header.
    #[error("Not a PDF document (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// Header, cross-reference table or trailer is corrupt or truncated.
    #[error("Corrupt PDF: {detail}")]
    Corrupt { detail: String },

    /// The document is encrypted and its information dictionary is unreadable.
    #[error("PDF is encrypted; metadata is not readable without a password")]
    Encrypted,
}

/// The metadata store could not complete an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend is unreachable, locked, or returned an I/O failure.
    #[error("Metadata store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be mapped back onto a record.
    #[error("Stored record for '{id}' is unreadable: {detail}")]
    Serialization { id: String, detail: String },

    /// The on-disk schema is newer than this build understands.
    #[error("Unsupported store schema version {found} (expected ≤ {supported})")]
    Schema { found: i64, supported: i64 },
}

/// A submission failed on the asynchronous path.
///
/// Reported through [`crate::ingest::IngestEvent::Failed`] and
/// [`crate::ingest::Receipt::wait`]. No record is written for the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("Metadata extraction failed: {0}")]
    MalformedDocument(#[from] MalformedDocumentError),

    #[error("Storing metadata failed: {0}")]
    Store(#[from] StoreError),

    /// Extraction exceeded the configured `extraction_timeout`.
    #[error("Metadata extraction timed out after {elapsed_ms}ms")]
    TimedOut { elapsed_ms: u64 },

    /// The extractor panicked; the panic was contained to this submission.
    #[error("Metadata extraction panicked: {0}")]
    Panicked(String),

    /// The pipeline stopped before this submission completed.
    #[error("Submission was dropped before completion")]
    Dropped,
}
