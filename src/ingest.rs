//! Ingestion pipeline: validate → hash → name → queue → extract → store.
//!
//! ```text
//! submit(bytes, filename)
//!   ├─ validate (empty payload, .pdf suffix)      ── ScanError, nothing else happens
//!   ├─ ContentHasher::digest                      ── identifier issued here
//!   ├─ SubmissionName::new(filename, now)
//!   └─ enqueue ──▶ dispatcher (≤ workers at once)
//!                     ├─ [skip if stored and reextract_duplicates = false]
//!                     ├─ extract::run_blocking    (blocking pool, timeout, panic containment)
//!                     ├─ MetadataStore::put       (scanned_at = now)
//!                     └─ IngestEvent broadcast + Receipt completion
//! ```
//!
//! `submit` returns as soon as the job is queued. Until the job completes a
//! lookup for the returned identifier may report not-found.
//!
//! Every job ends in exactly one [`IngestEvent`]; failures are additionally
//! logged at `error` level. Nothing is retried.

use crate::config::ScannerConfig;
use crate::error::{IngestError, ScanError};
use crate::extract::{self, panic_message, MetadataExtractor};
use crate::hash::{ContentHasher, Sha256Hasher};
use crate::model::{has_pdf_suffix, ContentIdentifier, PdfMetadataRecord, SubmissionName};
use crate::store::MetadataStore;
use bytes::Bytes;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

// ── Outcomes & events ────────────────────────────────────────────────────────

/// How a submission completed successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Metadata was extracted and written; carries the stored record.
    Stored(PdfMetadataRecord),
    /// The identifier was already stored and `reextract_duplicates` is off.
    Skipped,
}

/// Broadcast once per submission when it leaves the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    Stored {
        id: ContentIdentifier,
        filename: SubmissionName,
    },
    Skipped {
        id: ContentIdentifier,
        filename: SubmissionName,
    },
    Failed {
        id: ContentIdentifier,
        filename: SubmissionName,
        error: IngestError,
    },
}

impl IngestEvent {
    pub fn id(&self) -> &ContentIdentifier {
        match self {
            IngestEvent::Stored { id, .. }
            | IngestEvent::Skipped { id, .. }
            | IngestEvent::Failed { id, .. } => id,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, IngestEvent::Failed { .. })
    }
}

/// Handle to one queued submission.
#[derive(Debug)]
pub struct Receipt {
    id: ContentIdentifier,
    filename: SubmissionName,
    completion: oneshot::Receiver<Result<IngestOutcome, IngestError>>,
}

impl Receipt {
    pub fn id(&self) -> &ContentIdentifier {
        &self.id
    }

    pub fn filename(&self) -> &SubmissionName {
        &self.filename
    }

    /// Wait for the submission to leave the pipeline.
    ///
    /// Returns [`IngestError::Dropped`] if the pipeline was torn down (e.g.
    /// its runtime stopped) before the job ran.
    pub async fn wait(self) -> Result<IngestOutcome, IngestError> {
        self.completion.await.unwrap_or(Err(IngestError::Dropped))
    }
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub submitted: u64,
    pub stored: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Queued or running.
    pub in_flight: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    stored: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> IngestStats {
        let submitted = self.submitted.load(Ordering::Acquire);
        let stored = self.stored.load(Ordering::Acquire);
        let skipped = self.skipped.load(Ordering::Acquire);
        let failed = self.failed.load(Ordering::Acquire);
        IngestStats {
            submitted,
            stored,
            skipped,
            failed,
            in_flight: submitted.saturating_sub(stored + skipped + failed),
        }
    }
}

// ── Worker side ──────────────────────────────────────────────────────────────

struct Job {
    id: ContentIdentifier,
    filename: SubmissionName,
    bytes: Bytes,
    completion: Option<oneshot::Sender<Result<IngestOutcome, IngestError>>>,
}

/// State shared by every in-flight job.
struct Worker {
    config: ScannerConfig,
    extractor: Arc<dyn MetadataExtractor>,
    store: Arc<dyn MetadataStore>,
    events: broadcast::Sender<IngestEvent>,
    counters: Arc<Counters>,
}

impl Worker {
    async fn process(&self, job: Job) {
        let Job {
            id,
            filename,
            bytes,
            completion,
        } = job;

        info!("Starting metadata extraction for file: {}", filename);

        // A panicking store must not take the dispatcher down with it.
        let result = AssertUnwindSafe(self.extract_and_store(&id, &filename, bytes))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(IngestError::Panicked(panic_message(payload))));

        let event = match &result {
            Ok(IngestOutcome::Stored(_)) => {
                info!("Metadata saved successfully for hash: {}", id);
                self.counters.stored.fetch_add(1, Ordering::AcqRel);
                IngestEvent::Stored { id, filename }
            }
            Ok(IngestOutcome::Skipped) => {
                debug!("Metadata already stored for hash: {}, skipping", id);
                self.counters.skipped.fetch_add(1, Ordering::AcqRel);
                IngestEvent::Skipped { id, filename }
            }
            Err(e) => {
                error!("Error processing file {} (hash {}): {}", filename, id, e);
                self.counters.failed.fetch_add(1, Ordering::AcqRel);
                IngestEvent::Failed {
                    id,
                    filename,
                    error: e.clone(),
                }
            }
        };

        // No subscribers is not an error.
        let _ = self.events.send(event);
        if let Some(tx) = completion {
            let _ = tx.send(result);
        }
    }

    async fn extract_and_store(
        &self,
        id: &ContentIdentifier,
        filename: &SubmissionName,
        bytes: Bytes,
    ) -> Result<IngestOutcome, IngestError> {
        if !self.config.reextract_duplicates && self.store.contains(id.as_str()).await? {
            return Ok(IngestOutcome::Skipped);
        }

        let extracted = extract::run_blocking(
            Arc::clone(&self.extractor),
            bytes,
            self.config.extraction_timeout,
        )
        .await?;

        let record =
            PdfMetadataRecord::assemble(id.clone(), filename.clone(), extracted, Utc::now());
        self.store.put(record.clone()).await?;
        Ok(IngestOutcome::Stored(record))
    }
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

/// Accepts submissions and extracts their metadata in the background.
///
/// Must be created inside a Tokio runtime; the dispatcher task is spawned on
/// it.
pub struct IngestionPipeline {
    config: ScannerConfig,
    hasher: Arc<dyn ContentHasher>,
    queue: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    dispatcher: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<IngestEvent>,
    counters: Arc<Counters>,
}

impl IngestionPipeline {
    /// Pipeline hashing with SHA-256 in `config.identifier_encoding`.
    pub fn new(
        config: ScannerConfig,
        extractor: Arc<dyn MetadataExtractor>,
        store: Arc<dyn MetadataStore>,
    ) -> Result<Self, ScanError> {
        let hasher = Arc::new(Sha256Hasher::new(config.identifier_encoding));
        Self::with_hasher(config, hasher, extractor, store)
    }

    /// Pipeline with every capability supplied by the caller.
    pub fn with_hasher(
        config: ScannerConfig,
        hasher: Arc<dyn ContentHasher>,
        extractor: Arc<dyn MetadataExtractor>,
        store: Arc<dyn MetadataStore>,
    ) -> Result<Self, ScanError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            ScanError::Internal("IngestionPipeline must be created inside a Tokio runtime".into())
        })?;

        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let counters = Arc::new(Counters::default());
        let workers = config.workers.max(1);

        let worker = Arc::new(Worker {
            config: config.clone(),
            extractor,
            store,
            events: events.clone(),
            counters: Arc::clone(&counters),
        });

        // The stream ends once every sender is gone and the queue is empty;
        // for_each_concurrent then waits for the jobs still running.
        let dispatcher = runtime.spawn(async move {
            stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|job| (job, rx)) })
                .for_each_concurrent(workers, |job| {
                    let worker = Arc::clone(&worker);
                    async move { worker.process(job).await }
                })
                .await;
            debug!("Ingestion dispatcher drained");
        });

        info!(
            "Ingestion pipeline started ({} workers, {:?} identifiers)",
            workers, config.identifier_encoding
        );

        Ok(Self {
            config,
            hasher,
            queue: Mutex::new(Some(tx)),
            dispatcher: tokio::sync::Mutex::new(Some(dispatcher)),
            events,
            counters,
        })
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Accept a document and return its identifier without waiting for
    /// extraction.
    ///
    /// # Errors
    /// - [`ScanError::EmptyPayload`] / [`ScanError::InvalidFileType`]: nothing
    ///   was hashed or queued.
    /// - [`ScanError::PipelineClosed`] after [`shutdown`](Self::shutdown).
    pub fn submit(
        &self,
        bytes: impl Into<Bytes>,
        filename: &str,
    ) -> Result<ContentIdentifier, ScanError> {
        self.enqueue(bytes.into(), filename, None)
            .map(|(id, _)| id)
    }

    /// Like [`submit`](Self::submit), but returns a [`Receipt`] that resolves
    /// when this submission completes.
    pub fn submit_tracked(
        &self,
        bytes: impl Into<Bytes>,
        filename: &str,
    ) -> Result<Receipt, ScanError> {
        let (tx, rx) = oneshot::channel();
        let (id, filename) = self.enqueue(bytes.into(), filename, Some(tx))?;
        Ok(Receipt {
            id,
            filename,
            completion: rx,
        })
    }

    fn enqueue(
        &self,
        bytes: Bytes,
        original_filename: &str,
        completion: Option<oneshot::Sender<Result<IngestOutcome, IngestError>>>,
    ) -> Result<(ContentIdentifier, SubmissionName), ScanError> {
        validate(&bytes, original_filename)?;

        // The lock covers only the sender clone, never the hash.
        let sender = self
            .queue
            .lock()
            .map_err(|_| ScanError::Internal("submission queue lock poisoned".into()))?
            .clone()
            .ok_or(ScanError::PipelineClosed)?;

        let id = self.hasher.digest(&bytes);
        let filename = SubmissionName::new(original_filename, Utc::now());
        debug!(
            "Accepted {} ({} bytes) as {}",
            original_filename,
            bytes.len(),
            id
        );

        self.counters.submitted.fetch_add(1, Ordering::AcqRel);
        let job = Job {
            id: id.clone(),
            filename: filename.clone(),
            bytes,
            completion,
        };
        if sender.send(job).is_err() {
            // Dispatcher is gone (runtime shut down underneath us).
            self.counters.submitted.fetch_sub(1, Ordering::AcqRel);
            return Err(ScanError::PipelineClosed);
        }
        Ok((id, filename))
    }

    /// Receive an [`IngestEvent`] for every submission completed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> IngestStats {
        self.counters.snapshot()
    }

    /// Stop accepting submissions, then wait for queued and running jobs to
    /// finish.
    ///
    /// Idempotent. Later calls to `submit` return [`ScanError::PipelineClosed`].
    pub async fn shutdown(&self) {
        let sender = match self.queue.lock() {
            Ok(mut queue) => queue.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(sender);

        // Held across the drain; a concurrent caller waits here.
        let mut dispatcher = self.dispatcher.lock().await;
        if let Some(handle) = dispatcher.take() {
            let pending = self.stats().in_flight;
            if pending > 0 {
                info!("Draining {} pending submission(s)", pending);
            }
            if let Err(e) = handle.await {
                warn!("Ingestion dispatcher ended abnormally: {}", e);
            }
            info!("Ingestion pipeline stopped");
        }
    }
}

fn validate(bytes: &[u8], filename: &str) -> Result<(), ScanError> {
    if bytes.is_empty() {
        return Err(ScanError::EmptyPayload);
    }
    if !has_pdf_suffix(filename) {
        return Err(ScanError::InvalidFileType {
            filename: filename.to_string(),
        });
    }
    Ok(())
}
