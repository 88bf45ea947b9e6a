//! Ingestion pipeline behaviour against in-memory stores and generated PDFs.

mod common;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{TimeZone, Utc};
use common::*;
use pdf_metadata_scanner::{
    IdentifierEncoding, IngestError, IngestEvent, IngestOutcome, IngestionPipeline,
    LookupService, LopdfExtractor, MalformedDocumentError, MemoryMetadataStore,
    MetadataExtractor, MetadataStore, ScanError, ScannerConfig, StoreError,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

// ── Helpers ──────────────────────────────────────────────────────────────────

struct Harness {
    pipeline: IngestionPipeline,
    store: Arc<MemoryMetadataStore>,
    lookup: LookupService,
}

fn harness(config: ScannerConfig, extractor: Arc<dyn MetadataExtractor>) -> Harness {
    let store = Arc::new(MemoryMetadataStore::new());
    let pipeline = IngestionPipeline::new(config, extractor, store.clone()).unwrap();
    let lookup = LookupService::new(store.clone());
    Harness {
        pipeline,
        store,
        lookup,
    }
}

fn lopdf() -> Arc<dyn MetadataExtractor> {
    Arc::new(LopdfExtractor::new())
}

async fn next_event(rx: &mut tokio::sync::broadcast::Receiver<IngestEvent>) -> IngestEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("event within 5s")
        .expect("event channel open")
}

// ── Input rejection ──────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_payload_is_rejected_before_hashing() {
    let hasher = Arc::new(CountingHasher::default());
    let extractor = Arc::new(CountingExtractor::new(LopdfExtractor::new()));
    let store = Arc::new(MemoryMetadataStore::new());
    let pipeline = IngestionPipeline::with_hasher(
        ScannerConfig::default(),
        hasher.clone(),
        extractor.clone(),
        store.clone(),
    )
    .unwrap();

    let err = pipeline.submit(Vec::<u8>::new(), "x.pdf").unwrap_err();
    assert!(matches!(err, ScanError::EmptyPayload));
    assert!(err.is_caller_error());

    pipeline.shutdown().await;
    assert_eq!(hasher.calls(), 0);
    assert_eq!(extractor.calls(), 0);
    assert!(store.is_empty());
    assert_eq!(pipeline.stats().submitted, 0);
}

#[tokio::test]
async fn wrong_suffix_is_never_hashed() {
    let hasher = Arc::new(CountingHasher::default());
    let extractor = Arc::new(CountingExtractor::new(LopdfExtractor::new()));
    let store = Arc::new(MemoryMetadataStore::new());
    let pipeline = IngestionPipeline::with_hasher(
        ScannerConfig::default(),
        hasher.clone(),
        extractor.clone(),
        store.clone(),
    )
    .unwrap();

    let err = pipeline.submit(sample_report(), "x.txt").unwrap_err();
    assert!(matches!(err, ScanError::InvalidFileType { ref filename } if filename == "x.txt"));

    pipeline.shutdown().await;
    assert_eq!(hasher.calls(), 0);
    assert_eq!(extractor.calls(), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn suffix_check_ignores_case() {
    let h = harness(ScannerConfig::default(), lopdf());
    let receipt = h.pipeline.submit_tracked(sample_report(), "SCAN.PDF").unwrap();
    assert!(receipt.filename().as_str().starts_with("SCAN_"));
    assert!(receipt.filename().as_str().ends_with(".pdf"));
    assert!(matches!(receipt.wait().await, Ok(IngestOutcome::Stored(_))));
}

// ── End to end ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn report_round_trip() {
    init_tracing();
    let h = harness(ScannerConfig::default(), lopdf());
    let bytes = sample_report();
    let expected_id = STANDARD.encode(Sha256::digest(&bytes));

    let before = Utc::now();
    let receipt = h.pipeline.submit_tracked(bytes, "report.pdf").unwrap();
    assert_eq!(receipt.id().as_str(), expected_id);

    let id = receipt.id().clone();
    receipt.wait().await.expect("extraction succeeds");
    let after = Utc::now();

    let record = h
        .lookup
        .lookup(id.as_str())
        .await
        .unwrap()
        .expect("record stored");

    assert_eq!(record.content_identifier, id);

    let name = record.filename.as_str();
    let millis: i64 = name
        .strip_prefix("report_")
        .and_then(|rest| rest.strip_suffix(".pdf"))
        .and_then(|ms| ms.parse().ok())
        .unwrap_or_else(|| panic!("unexpected filename {name}"));
    assert!(millis >= before.timestamp_millis() && millis <= after.timestamp_millis());

    assert!(record.scanned_at >= before);
    assert_eq!(record.pdf_version, "1.4");
    assert_eq!(record.producer.as_deref(), Some("TestProducer"));
    assert_eq!(record.author.as_deref(), Some("TestAuthor"));
    let jan_first = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
    assert_eq!(record.created_at, Some(jan_first));
    assert_eq!(record.modified_at, Some(jan_first));
}

#[tokio::test]
async fn hex_identifiers_when_configured() {
    let config = ScannerConfig::builder()
        .identifier_encoding(IdentifierEncoding::Hex)
        .build()
        .unwrap();
    let h = harness(config, lopdf());
    let bytes = sample_report();
    let id = h.pipeline.submit(bytes.clone(), "r.pdf").unwrap();

    assert_eq!(id.as_str(), hex::encode(Sha256::digest(&bytes)));
}

#[tokio::test]
async fn never_submitted_is_not_found() {
    let h = harness(ScannerConfig::default(), lopdf());
    assert_eq!(h.lookup.lookup("never-submitted-id").await.unwrap(), None);
}

// ── Upsert semantics ─────────────────────────────────────────────────────────

#[tokio::test]
async fn resubmission_overwrites_with_latest_name() {
    let h = harness(ScannerConfig::default(), lopdf());
    let bytes = sample_report();

    let first = h.pipeline.submit_tracked(bytes.clone(), "first.pdf").unwrap();
    let first_id = first.id().clone();
    let first_record = match first.wait().await.unwrap() {
        IngestOutcome::Stored(record) => record,
        other => panic!("expected Stored, got {other:?}"),
    };

    tokio::time::sleep(Duration::from_millis(5)).await;

    let second = h.pipeline.submit_tracked(bytes, "second.pdf").unwrap();
    assert_eq!(second.id(), &first_id);
    second.wait().await.unwrap();

    let stored = h.lookup.lookup(first_id.as_str()).await.unwrap().unwrap();
    assert!(stored.filename.as_str().starts_with("second_"));
    assert!(stored.scanned_at >= first_record.scanned_at);
    assert_eq!(stored.pdf_version, first_record.pdf_version);
    assert_eq!(stored.author, first_record.author);
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn skip_duplicates_leaves_record_untouched() {
    let config = ScannerConfig::builder()
        .reextract_duplicates(false)
        .build()
        .unwrap();
    let extractor = Arc::new(CountingExtractor::new(LopdfExtractor::new()));
    let h = harness(config, extractor.clone());
    let bytes = sample_report();

    let first = h.pipeline.submit_tracked(bytes.clone(), "first.pdf").unwrap();
    let id = first.id().clone();
    assert!(matches!(first.wait().await, Ok(IngestOutcome::Stored(_))));

    let mut events = h.pipeline.subscribe();
    let second = h.pipeline.submit_tracked(bytes, "second.pdf").unwrap();
    assert_eq!(second.wait().await, Ok(IngestOutcome::Skipped));
    assert!(matches!(next_event(&mut events).await, IngestEvent::Skipped { .. }));

    assert_eq!(extractor.calls(), 1);
    let stored = h.lookup.lookup(id.as_str()).await.unwrap().unwrap();
    assert!(stored.filename.as_str().starts_with("first_"));
    assert_eq!(h.pipeline.stats().skipped, 1);
}

// ── Consistency gap ──────────────────────────────────────────────────────────

#[tokio::test]
async fn lookup_is_absent_until_extraction_completes() {
    let (gated, release) = GatedExtractor::new();
    let h = harness(ScannerConfig::default(), Arc::new(gated));

    let receipt = h.pipeline.submit_tracked(sample_report(), "slow.pdf").unwrap();
    let id = receipt.id().clone();

    // Submit already returned; extraction is parked on the gate.
    assert_eq!(h.lookup.lookup(id.as_str()).await.unwrap(), None);
    assert_eq!(h.pipeline.stats().in_flight, 1);

    release.send(()).unwrap();
    receipt.wait().await.unwrap();

    let record = h.lookup.lookup(id.as_str()).await.unwrap();
    assert_eq!(record.map(|r| r.pdf_version), Some("1.7".to_string()));
    assert_eq!(h.pipeline.stats().in_flight, 0);
}

// ── Failure isolation ────────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_document_fails_alone() {
    init_tracing();
    let h = harness(ScannerConfig::default(), lopdf());
    let mut events = h.pipeline.subscribe();

    let bad = h
        .pipeline
        .submit_tracked(&b"This is not a PDF file"[..], "bad.pdf")
        .unwrap();
    let good = h.pipeline.submit_tracked(sample_report(), "good.pdf").unwrap();
    let bad_id = bad.id().clone();
    let good_id = good.id().clone();

    let (bad_result, good_result) = tokio::join!(bad.wait(), good.wait());
    assert!(matches!(
        bad_result,
        Err(IngestError::MalformedDocument(MalformedDocumentError::NotAPdf { .. }))
    ));
    assert!(matches!(good_result, Ok(IngestOutcome::Stored(_))));

    let mut seen = vec![next_event(&mut events).await, next_event(&mut events).await];
    seen.sort_by_key(|e| e.is_failure());
    assert_eq!(seen[0].id(), &good_id);
    assert!(matches!(&seen[1], IngestEvent::Failed { id, .. } if id == &bad_id));

    assert_eq!(h.lookup.lookup(bad_id.as_str()).await.unwrap(), None);
    assert!(h.lookup.lookup(good_id.as_str()).await.unwrap().is_some());

    let stats = h.pipeline.stats();
    assert_eq!((stats.stored, stats.failed), (1, 1));
}

#[tokio::test]
async fn store_outage_is_reported_not_raised() {
    let store = Arc::new(UnavailableStore);
    let pipeline =
        IngestionPipeline::new(ScannerConfig::default(), lopdf(), store.clone()).unwrap();
    let mut events = pipeline.subscribe();

    // Submission itself succeeds; the failure arrives on the async path.
    let receipt = pipeline.submit_tracked(sample_report(), "a.pdf").unwrap();
    let err = receipt.wait().await.unwrap_err();
    assert_eq!(err, IngestError::Store(StoreError::Unavailable("disk full".into())));

    match next_event(&mut events).await {
        IngestEvent::Failed { error, .. } => {
            assert!(matches!(error, IngestError::Store(_)))
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(store.get("anything").await.unwrap().is_none());
}

#[tokio::test]
async fn extractor_panic_is_contained() {
    let h = harness(ScannerConfig::default(), Arc::new(PanickingExtractor));

    let first = h.pipeline.submit_tracked(sample_report(), "a.pdf").unwrap();
    assert_eq!(
        first.wait().await,
        Err(IngestError::Panicked("extractor bug".into()))
    );

    // The pipeline keeps accepting and processing work.
    let second = h
        .pipeline
        .submit_tracked(&b"%PDF-1.4 other"[..], "b.pdf")
        .unwrap();
    assert!(second.wait().await.is_err());
    assert!(h.store.is_empty());
    assert_eq!(h.pipeline.stats().failed, 2);
}

#[tokio::test]
async fn extraction_timeout_stores_nothing() {
    let config = ScannerConfig::builder()
        .extraction_timeout(Duration::from_millis(50))
        .build()
        .unwrap();
    let h = harness(config, Arc::new(SlowExtractor(Duration::from_millis(400))));

    let receipt = h.pipeline.submit_tracked(sample_report(), "a.pdf").unwrap();
    let id = receipt.id().clone();
    assert_eq!(
        receipt.wait().await,
        Err(IngestError::TimedOut { elapsed_ms: 50 })
    );
    assert_eq!(h.lookup.lookup(id.as_str()).await.unwrap(), None);
}

// ── Concurrency & lifecycle ──────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_submissions_all_land() {
    let config = ScannerConfig::builder().workers(3).build().unwrap();
    let h = harness(config, lopdf());

    let mut receipts = Vec::new();
    for i in 0..20 {
        let author = format!("author-{i}");
        let bytes = build_pdf(&PdfFixture {
            version: "1.5",
            author: Some(&author),
            ..Default::default()
        });
        receipts.push(
            h.pipeline
                .submit_tracked(bytes, &format!("doc{i}.pdf"))
                .unwrap(),
        );
    }

    let ids: Vec<_> = receipts.iter().map(|r| r.id().clone()).collect();
    for receipt in receipts {
        assert!(matches!(receipt.wait().await, Ok(IngestOutcome::Stored(_))));
    }

    assert_eq!(h.store.len(), 20);
    for (i, id) in ids.iter().enumerate() {
        let record = h.lookup.lookup(id.as_str()).await.unwrap().unwrap();
        assert_eq!(record.author, Some(format!("author-{i}")));
    }
}

#[tokio::test]
async fn shutdown_drains_queued_work() {
    let config = ScannerConfig::builder().workers(1).build().unwrap();
    let h = harness(config, Arc::new(SlowExtractor(Duration::from_millis(20))));

    for i in 0..3 {
        let bytes = format!("%PDF-1.4 doc {i}").into_bytes();
        h.pipeline.submit(bytes, &format!("{i}.pdf")).unwrap();
    }
    h.pipeline.shutdown().await;

    let stats = h.pipeline.stats();
    assert_eq!(stats.stored, 3);
    assert_eq!(stats.in_flight, 0);
    assert_eq!(h.store.len(), 3);

    let err = h.pipeline.submit(sample_report(), "late.pdf").unwrap_err();
    assert!(matches!(err, ScanError::PipelineClosed));
}
