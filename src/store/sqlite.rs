//! SQLite-backed [`MetadataStore`].
//!
//! One table, `pdf_metadata`, one row per content identifier. Timestamps are
//! stored as RFC 3339 text in UTC. The schema version lives in
//! `PRAGMA user_version`; opening a file written by a newer build fails with
//! [`StoreError::Schema`] instead of guessing at its layout.
//!
//! `rusqlite::Connection` is blocking and not `Sync`: it sits behind a mutex
//! and every call runs on Tokio's blocking pool.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::MetadataStore;
use crate::error::StoreError;
use crate::model::{ContentIdentifier, PdfMetadataRecord, SubmissionName};

const SCHEMA_VERSION: i64 = 1;

const CREATE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS pdf_metadata (
    sha256   TEXT PRIMARY KEY NOT NULL,
    filename TEXT NOT NULL,
    version  TEXT NOT NULL DEFAULT '',
    producer TEXT,
    author   TEXT,
    created  TEXT,
    modified TEXT,
    scanned  TEXT NOT NULL
);
PRAGMA user_version = 1;
";

const UPSERT: &str = "
INSERT INTO pdf_metadata (sha256, filename, version, producer, author, created, modified, scanned)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
ON CONFLICT(sha256) DO UPDATE SET
    filename = excluded.filename,
    version  = excluded.version,
    producer = excluded.producer,
    author   = excluded.author,
    created  = excluded.created,
    modified = excluded.modified,
    scanned  = excluded.scanned
";

const SELECT_ONE: &str = "
SELECT sha256, filename, version, producer, author, created, modified, scanned
FROM pdf_metadata WHERE sha256 = ?1
";

/// Row shape as stored, before timestamp parsing.
struct StoredRow {
    sha256: String,
    filename: String,
    version: String,
    producer: Option<String>,
    author: Option<String>,
    created: Option<String>,
    modified: Option<String>,
    scanned: String,
}

impl StoredRow {
    fn from_record(record: &PdfMetadataRecord) -> Self {
        Self {
            sha256: record.content_identifier.as_str().to_owned(),
            filename: record.filename.as_str().to_owned(),
            version: record.pdf_version.clone(),
            producer: record.producer.clone(),
            author: record.author.clone(),
            created: record.created_at.map(format_timestamp),
            modified: record.modified_at.map(format_timestamp),
            scanned: format_timestamp(record.scanned_at),
        }
    }

    fn into_record(self) -> Result<PdfMetadataRecord, StoreError> {
        let id = self.sha256;
        let parse = |value: &str| {
            parse_timestamp(value).map_err(|detail| StoreError::Serialization {
                id: id.clone(),
                detail,
            })
        };
        let created_at = self.created.as_deref().map(parse).transpose()?;
        let modified_at = self.modified.as_deref().map(parse).transpose()?;
        let scanned_at = parse(&self.scanned)?;

        Ok(PdfMetadataRecord {
            content_identifier: ContentIdentifier::new(id),
            filename: SubmissionName::from_stored(self.filename),
            pdf_version: self.version,
            producer: self.producer,
            author: self.author,
            created_at,
            modified_at,
            scanned_at,
        })
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("bad timestamp '{value}': {e}"))
}

fn unavailable(e: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

/// [`MetadataStore`] persisted in a SQLite database file.
#[derive(Clone)]
pub struct SqliteMetadataStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMetadataStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(unavailable)?;
        info!("Opened metadata database at {}", path.display());
        Self::init(conn)
    }

    /// A private, non-persistent database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory().map_err(unavailable)?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(unavailable)?;
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("connection mutex poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
    }
}

fn migrate(conn: &Connection) -> Result<(), StoreError> {
    let found: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(unavailable)?;

    if found > SCHEMA_VERSION {
        return Err(StoreError::Schema {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    if found < SCHEMA_VERSION {
        debug!("Migrating metadata schema {} → {}", found, SCHEMA_VERSION);
        conn.execute_batch(CREATE_SCHEMA).map_err(unavailable)?;
    }
    Ok(())
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn put(&self, record: PdfMetadataRecord) -> Result<(), StoreError> {
        let row = StoredRow::from_record(&record);
        self.with_conn(move |conn| {
            conn.execute(
                UPSERT,
                params![
                    row.sha256,
                    row.filename,
                    row.version,
                    row.producer,
                    row.author,
                    row.created,
                    row.modified,
                    row.scanned
                ],
            )
            .map_err(unavailable)?;
            Ok(())
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<PdfMetadataRecord>, StoreError> {
        let id = id.to_owned();
        let row = self
            .with_conn(move |conn| {
                conn.query_row(SELECT_ONE, params![id], |row| {
                    Ok(StoredRow {
                        sha256: row.get(0)?,
                        filename: row.get(1)?,
                        version: row.get(2)?,
                        producer: row.get(3)?,
                        author: row.get(4)?,
                        created: row.get(5)?,
                        modified: row.get(6)?,
                        scanned: row.get(7)?,
                    })
                })
                .optional()
                .map_err(unavailable)
            })
            .await?;

        row.map(StoredRow::into_record).transpose()
    }
}
