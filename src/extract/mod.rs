//! Metadata extraction: raw PDF bytes → [`ExtractedMetadata`].
//!
//! The pipeline only sees the [`MetadataExtractor`] trait. Two backends exist:
//!
//! ```text
//! bytes ──▶ %PDF magic check ──▶ backend parse ──▶ /Info dictionary ──▶ ExtractedMetadata
//!                                  │
//!                                  ├─ lopdf_backend   pure Rust (default)
//!                                  └─ pdfium_backend  libpdfium (feature "pdfium")
//! ```
//!
//! Extractors are synchronous and CPU-bound. [`run_blocking`] moves a call
//! onto Tokio's blocking pool, contains panics, and applies the optional
//! timeout; the ingestion pipeline and the CLI both go through it.

pub mod date;
pub mod lopdf_backend;
#[cfg(feature = "pdfium")]
pub mod pdfium_backend;

pub use lopdf_backend::LopdfExtractor;
#[cfg(feature = "pdfium")]
pub use pdfium_backend::PdfiumExtractor;

use crate::error::{IngestError, MalformedDocumentError};
use crate::model::ExtractedMetadata;
use bytes::Bytes;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

/// Parses document bytes into a metadata record.
///
/// Implementations are invoked concurrently from several blocking threads
/// and must not keep mutable state between calls.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedMetadata, MalformedDocumentError>;
}

/// Reject payloads that do not start with the `%PDF` header.
pub(crate) fn check_magic(bytes: &[u8]) -> Result<(), MalformedDocumentError> {
    if bytes.starts_with(b"%PDF") {
        Ok(())
    } else {
        Err(MalformedDocumentError::NotAPdf {
            magic: bytes.iter().take(4).copied().collect(),
        })
    }
}

/// Run `extractor` on the blocking pool.
///
/// A panic inside the extractor becomes [`IngestError::Panicked`]; exceeding
/// `timeout` becomes [`IngestError::TimedOut`].
pub async fn run_blocking(
    extractor: Arc<dyn MetadataExtractor>,
    bytes: Bytes,
    timeout: Option<Duration>,
) -> Result<ExtractedMetadata, IngestError> {
    let task = tokio::task::spawn_blocking(move || extractor.extract(&bytes));

    let joined = match timeout {
        Some(limit) => tokio::time::timeout(limit, task)
            .await
            .map_err(|_| IngestError::TimedOut {
                elapsed_ms: limit.as_millis() as u64,
            })?,
        None => task.await,
    };

    match joined {
        Ok(result) => result.map_err(IngestError::from),
        Err(e) if e.is_panic() => Err(IngestError::Panicked(panic_message(e.into_panic()))),
        Err(e) => Err(IngestError::Panicked(e.to_string())),
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Decode a PDF text string.
///
/// UTF-16BE and UTF-8 strings carry a byte-order mark; anything else is
/// PDFDocEncoding, approximated here as Latin-1.
pub(crate) fn decode_text_string(raw: &[u8]) -> String {
    let decoded = if let Some(utf16) = raw.strip_prefix(&[0xFE, 0xFF]) {
        let units = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    } else if let Some(utf8) = raw.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(utf8).into_owned()
    } else {
        raw.iter().map(|&b| b as char).collect::<String>()
    };
    decoded.trim_end_matches('\0').trim().to_string()
}

/// `None` for empty strings.
pub(crate) fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
