//! Configuration for the ingestion pipeline.
//!
//! All pipeline behaviour is controlled through [`ScannerConfig`], built via
//! its [`ScannerConfigBuilder`]. The capabilities themselves (hasher,
//! extractor, store) are passed to [`crate::ingest::IngestionPipeline::new`]
//! separately; this struct only carries plain values.

use crate::error::ScanError;
use crate::hash::IdentifierEncoding;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for an [`crate::ingest::IngestionPipeline`].
///
/// # Example
/// ```rust
/// use pdf_metadata_scanner::{IdentifierEncoding, ScannerConfig};
/// use std::time::Duration;
///
/// let config = ScannerConfig::builder()
///     .workers(8)
///     .identifier_encoding(IdentifierEncoding::Hex)
///     .extraction_timeout(Duration::from_secs(30))
///     .build()
///     .unwrap();
/// assert_eq!(config.workers, 8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Maximum number of extractions running at once. Default: 4.
    ///
    /// Extraction is CPU-bound and runs on Tokio's blocking pool; submissions
    /// beyond this limit wait in the queue.
    pub workers: usize,

    /// Encoding of issued identifiers. Default: [`IdentifierEncoding::Base64`].
    pub identifier_encoding: IdentifierEncoding,

    /// Re-run extraction when the identifier is already stored. Default: true.
    ///
    /// When `false`, a byte-identical resubmission is reported as
    /// [`crate::ingest::IngestEvent::Skipped`] and the stored record (including
    /// its `filename` and `scanned` time) is left untouched.
    pub reextract_duplicates: bool,

    /// Upper bound for a single extraction. Default: `None` (unbounded).
    ///
    /// On expiry the submission is reported as
    /// [`crate::error::IngestError::TimedOut`]. The blocking thread running
    /// the extractor cannot be interrupted; its eventual result is discarded.
    pub extraction_timeout: Option<Duration>,

    /// Buffer size of the [`crate::ingest::IngestEvent`] broadcast. Default: 256.
    ///
    /// Subscribers that fall further behind than this miss events (they
    /// observe a `Lagged` error) but never slow the pipeline down.
    pub event_capacity: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            identifier_encoding: IdentifierEncoding::default(),
            reextract_duplicates: true,
            extraction_timeout: None,
            event_capacity: 256,
        }
    }
}

impl ScannerConfig {
    /// Create a new builder for `ScannerConfig`.
    pub fn builder() -> ScannerConfigBuilder {
        ScannerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ScannerConfig`].
#[derive(Debug)]
pub struct ScannerConfigBuilder {
    config: ScannerConfig,
}

impl ScannerConfigBuilder {
    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n.max(1);
        self
    }

    pub fn identifier_encoding(mut self, encoding: IdentifierEncoding) -> Self {
        self.config.identifier_encoding = encoding;
        self
    }

    pub fn reextract_duplicates(mut self, v: bool) -> Self {
        self.config.reextract_duplicates = v;
        self
    }

    pub fn extraction_timeout(mut self, timeout: Duration) -> Self {
        self.config.extraction_timeout = Some(timeout);
        self
    }

    pub fn event_capacity(mut self, n: usize) -> Self {
        self.config.event_capacity = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ScannerConfig, ScanError> {
        let c = &self.config;
        if c.workers == 0 {
            return Err(ScanError::InvalidConfig("workers must be ≥ 1".into()));
        }
        if c.event_capacity == 0 {
            return Err(ScanError::InvalidConfig(
                "event_capacity must be ≥ 1".into(),
            ));
        }
        if c.extraction_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ScanError::InvalidConfig(
                "extraction_timeout must be greater than zero".into(),
            ));
        }
        Ok(self.config)
    }
}
