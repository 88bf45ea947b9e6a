//! Shared fixtures for the integration tests: generated PDFs and fake
//! capabilities.

#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::{dictionary, Dictionary, Document, Object};
use pdf_metadata_scanner::{
    ContentHasher, ContentIdentifier, ExtractedMetadata, MalformedDocumentError,
    MetadataExtractor, MetadataStore, PdfMetadataRecord, Sha256Hasher, StoreError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Mutex};

/// Route library logs to the test harness; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// ── PDF builder ──────────────────────────────────────────────────────────────

/// Metadata to embed in a generated document.
#[derive(Debug, Clone, Default)]
pub struct PdfFixture<'a> {
    pub version: &'a str,
    pub author: Option<&'a str>,
    pub producer: Option<&'a str>,
    pub created: Option<&'a str>,
    pub modified: Option<&'a str>,
}

/// A minimal one-page PDF with the given header version and `/Info` entries.
pub fn build_pdf(fixture: &PdfFixture<'_>) -> Vec<u8> {
    let version = if fixture.version.is_empty() { "1.4" } else { fixture.version };
    let mut doc = Document::with_version(version);

    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => Object::Integer(1),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut info = Dictionary::new();
    let entries = [
        ("Author", fixture.author),
        ("Producer", fixture.producer),
        ("CreationDate", fixture.created),
        ("ModDate", fixture.modified),
    ];
    for (key, value) in entries {
        if let Some(value) = value {
            info.set(key, Object::string_literal(value));
        }
    }
    if !info.is_empty() {
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", info_id);
    }

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("save generated pdf");
    buf
}

/// The report used by the end-to-end scenarios.
pub fn sample_report() -> Vec<u8> {
    build_pdf(&PdfFixture {
        version: "1.4",
        author: Some("TestAuthor"),
        producer: Some("TestProducer"),
        created: Some("D:20240101100000Z"),
        modified: Some("D:20240101100000Z"),
    })
}

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Wraps [`Sha256Hasher`] and counts calls.
#[derive(Default)]
pub struct CountingHasher {
    inner: Sha256Hasher,
    pub calls: AtomicUsize,
}

impl CountingHasher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ContentHasher for CountingHasher {
    fn digest(&self, bytes: &[u8]) -> ContentIdentifier {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.digest(bytes)
    }
}

/// Delegates to an inner extractor and counts calls.
pub struct CountingExtractor<E> {
    inner: E,
    calls: AtomicUsize,
}

impl<E> CountingExtractor<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<E: MetadataExtractor> MetadataExtractor for CountingExtractor<E> {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedMetadata, MalformedDocumentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.extract(bytes)
    }
}

/// Blocks every extraction until the test releases it.
pub struct GatedExtractor {
    gate: Mutex<mpsc::Receiver<()>>,
}

impl GatedExtractor {
    pub fn new() -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (Self { gate: Mutex::new(rx) }, tx)
    }
}

impl MetadataExtractor for GatedExtractor {
    fn extract(&self, _bytes: &[u8]) -> Result<ExtractedMetadata, MalformedDocumentError> {
        let released = self.gate.lock().expect("gate lock").recv();
        if released.is_err() {
            return Err(MalformedDocumentError::Corrupt {
                detail: "gate closed".into(),
            });
        }
        Ok(ExtractedMetadata {
            pdf_version: Some("1.7".into()),
            ..Default::default()
        })
    }
}

/// Panics on every call.
pub struct PanickingExtractor;

impl MetadataExtractor for PanickingExtractor {
    fn extract(&self, _bytes: &[u8]) -> Result<ExtractedMetadata, MalformedDocumentError> {
        panic!("extractor bug");
    }
}

/// Sleeps before succeeding.
pub struct SlowExtractor(pub std::time::Duration);

impl MetadataExtractor for SlowExtractor {
    fn extract(&self, _bytes: &[u8]) -> Result<ExtractedMetadata, MalformedDocumentError> {
        std::thread::sleep(self.0);
        Ok(ExtractedMetadata::default())
    }
}

/// A store whose writes always fail.
#[derive(Default)]
pub struct UnavailableStore;

#[async_trait]
impl MetadataStore for UnavailableStore {
    async fn put(&self, _record: PdfMetadataRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disk full".into()))
    }

    async fn get(&self, _id: &str) -> Result<Option<PdfMetadataRecord>, StoreError> {
        Ok(None)
    }
}
