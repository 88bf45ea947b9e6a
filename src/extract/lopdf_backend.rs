//! Pure-Rust extractor built on `lopdf`.
//!
//! Reads the header version and the trailer's `/Info` dictionary. Page
//! content is never decoded.

use super::date::parse_pdf_date;
use super::{check_magic, decode_text_string, non_empty, MetadataExtractor};
use crate::error::MalformedDocumentError;
use crate::model::ExtractedMetadata;
use ::lopdf::{Dictionary, Document, Object};
use tracing::debug;

/// Default [`MetadataExtractor`]. Stateless; one instance can serve every
/// worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfExtractor;

impl LopdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataExtractor for LopdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedMetadata, MalformedDocumentError> {
        check_magic(bytes)?;

        let document = Document::load_mem(bytes).map_err(|e| MalformedDocumentError::Corrupt {
            detail: e.to_string(),
        })?;

        let info = info_dictionary(&document);
        let text = |key: &[u8]| info.and_then(|dict| text_value(&document, dict, key));

        let metadata = ExtractedMetadata {
            pdf_version: non_empty(document.version.trim().to_string()),
            producer: text(b"Producer"),
            author: text(b"Author"),
            created: text(b"CreationDate").as_deref().and_then(parse_pdf_date),
            modified: text(b"ModDate").as_deref().and_then(parse_pdf_date),
        };
        debug!(
            "Parsed PDF {} (info dictionary: {})",
            metadata.pdf_version.as_deref().unwrap_or("?"),
            info.is_some()
        );
        Ok(metadata)
    }
}

/// The trailer's `/Info` entry, inline or indirect.
fn info_dictionary(document: &Document) -> Option<&Dictionary> {
    let info = document.trailer.get(b"Info").ok()?;
    resolve(document, info)?.as_dict().ok()
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

fn text_value(document: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    match resolve(document, dict.get(key).ok()?)? {
        Object::String(raw, _) => non_empty(decode_text_string(raw)),
        Object::Name(raw) => non_empty(String::from_utf8_lossy(raw).trim().to_string()),
        _ => None,
    }
}
