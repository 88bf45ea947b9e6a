//! Native extractor backed by libpdfium through `pdfium-render`.
//!
//! The library is bound once, at construction: `PDFIUM_LIB_PATH` names an
//! explicit library file, otherwise the system search path is used. With the
//! `thread_safe` feature of `pdfium-render` every call into pdfium is
//! serialised, so concurrent workers queue on this backend.

use super::date::parse_pdf_date;
use super::{check_magic, non_empty, MetadataExtractor};
use crate::error::{MalformedDocumentError, ScanError};
use crate::model::ExtractedMetadata;
use pdfium_render::prelude::*;
use tracing::info;

pub struct PdfiumExtractor {
    pdfium: Pdfium,
}

impl PdfiumExtractor {
    /// Bind to libpdfium.
    pub fn bind() -> Result<Self, ScanError> {
        let bindings = match std::env::var("PDFIUM_LIB_PATH") {
            Ok(path) if !path.is_empty() => {
                info!("Binding pdfium from PDFIUM_LIB_PATH={}", path);
                Pdfium::bind_to_library(&path)
            }
            _ => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| {
            ScanError::ExtractorUnavailable(format!(
                "could not bind libpdfium ({e:?}); set PDFIUM_LIB_PATH=/path/to/libpdfium"
            ))
        })?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl MetadataExtractor for PdfiumExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedMetadata, MalformedDocumentError> {
        check_magic(bytes)?;

        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| {
                let detail = format!("{:?}", e);
                if detail.contains("Password") || detail.contains("password") {
                    MalformedDocumentError::Encrypted
                } else {
                    MalformedDocumentError::Corrupt { detail }
                }
            })?;

        let metadata = document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata
                .get(tag)
                .and_then(|t| non_empty(t.value().trim().to_string()))
        };

        Ok(ExtractedMetadata {
            pdf_version: version_string(&format!("{:?}", document.version())),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            created: get_meta(PdfDocumentMetadataTagType::CreationDate)
                .as_deref()
                .and_then(parse_pdf_date),
            modified: get_meta(PdfDocumentMetadataTagType::ModificationDate)
                .as_deref()
                .and_then(parse_pdf_date),
        })
    }
}

/// `Pdf1_4` → `1.4`; `Unset` / `Other(..)` → `None`.
fn version_string(debug_name: &str) -> Option<String> {
    let digits = debug_name.strip_prefix("Pdf")?.replace('_', ".");
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        Some(digits)
    } else {
        None
    }
}
