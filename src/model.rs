//! Domain types shared by the hasher, extractors, stores and the pipeline.
//!
//! JSON field names of [`PdfMetadataRecord`] follow the wire format served by
//! the HTTP surface (`sha256`, `version`, `created`, …) so existing clients
//! keep working; the Rust field names describe what each value means.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content-derived identifier: the encoded SHA-256 digest of the raw bytes.
///
/// The primary key of every [`crate::store::MetadataStore`]. Identical bytes
/// always produce an identical identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentIdentifier(String);

impl ContentIdentifier {
    /// Wrap an already-encoded identifier (e.g. a key read back from a store).
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ContentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Informational display name: `<stem>_<unix-millis>.pdf`.
///
/// Not unique and never used as a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionName(String);

impl SubmissionName {
    /// Derive the name from the caller's filename and the ingestion instant.
    ///
    /// The `.pdf` suffix is removed case-insensitively before the timestamp
    /// is appended, so `Report.PDF` becomes `Report_<ms>.pdf`.
    pub fn new(original_filename: &str, ingested_at: DateTime<Utc>) -> Self {
        let stem = strip_pdf_suffix(original_filename);
        Self(format!("{}_{}.pdf", stem, ingested_at.timestamp_millis()))
    }

    /// Wrap a stored name verbatim.
    pub fn from_stored(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `true` if `filename` ends in `.pdf`, ignoring ASCII case.
pub fn has_pdf_suffix(filename: &str) -> bool {
    let bytes = filename.as_bytes();
    bytes.len() >= 4 && bytes[bytes.len() - 4..].eq_ignore_ascii_case(b".pdf")
}

fn strip_pdf_suffix(filename: &str) -> &str {
    if has_pdf_suffix(filename) {
        // The last four bytes are ASCII, so this is a char boundary.
        &filename[..filename.len() - 4]
    } else {
        filename
    }
}

/// What an extractor reads out of a document. Every field is independently
/// optional: documents may omit a value or carry a malformed one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    /// Header version, e.g. `"1.4"`.
    pub pdf_version: Option<String>,
    pub producer: Option<String>,
    pub author: Option<String>,
    /// `/CreationDate` from the information dictionary, normalised to UTC.
    pub created: Option<DateTime<Utc>>,
    /// `/ModDate` from the information dictionary, normalised to UTC.
    pub modified: Option<DateTime<Utc>>,
}

/// The persisted entity, keyed by [`ContentIdentifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfMetadataRecord {
    #[serde(rename = "sha256")]
    pub content_identifier: ContentIdentifier,

    pub filename: SubmissionName,

    /// Empty when the document header carried no readable version.
    #[serde(rename = "version")]
    pub pdf_version: String,

    pub producer: Option<String>,

    pub author: Option<String>,

    #[serde(rename = "created")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(rename = "modified")]
    pub modified_at: Option<DateTime<Utc>>,

    /// Wall-clock time extraction completed.
    #[serde(rename = "scanned")]
    pub scanned_at: DateTime<Utc>,
}

impl PdfMetadataRecord {
    /// Combine an extraction result with the submission's identity.
    pub fn assemble(
        content_identifier: ContentIdentifier,
        filename: SubmissionName,
        extracted: ExtractedMetadata,
        scanned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            content_identifier,
            filename,
            pdf_version: extracted.pdf_version.unwrap_or_default(),
            producer: extracted.producer,
            author: extracted.author,
            created_at: extracted.created,
            modified_at: extracted.modified,
            scanned_at,
        }
    }
}
