//! CLI binary for pdf-metadata-scanner.
//!
//! `serve` runs the HTTP service; `inspect` and `hash` work on local files
//! without a store.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pdf_metadata_scanner::server::{self, AppState, ServerConfig};
use pdf_metadata_scanner::{
    extract, ContentHasher, IdentifierEncoding, IngestionPipeline, LookupService,
    LopdfExtractor, MemoryMetadataStore, MetadataExtractor, MetadataStore, ScannerConfig,
    Sha256Hasher,
};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on :8080 with a SQLite database
  pdfscan serve --database metadata.db

  # In-memory store, hex identifiers, skip re-extraction of known files
  pdfscan serve --encoding hex --skip-duplicates

  # Upload and look up
  curl -F file=@report.pdf http://localhost:8080/scan
  curl http://localhost:8080/lookup/<sha256>

  # Read metadata from a local file without storing it
  pdfscan inspect report.pdf --json

  # Print identifiers
  pdfscan hash *.pdf

ENVIRONMENT VARIABLES:
  RUST_LOG                   Log filter (overrides -v / -q)
  PDFSCAN_BIND               Listen address for `serve`
  PDFSCAN_DATABASE           SQLite database path for `serve`
  PDFSCAN_WORKERS            Concurrent extractions
  PDFSCAN_ENCODING           Identifier encoding: base64, hex
  PDFSCAN_EXTRACTION_TIMEOUT Per-document extraction limit in seconds
  PDFIUM_LIB_PATH            libpdfium to bind for --engine pdfium
"#;

/// Content-addressed PDF metadata scanner.
#[derive(Parser, Debug)]
#[command(
    name = "pdfscan",
    version,
    about = "Content-addressed PDF metadata ingestion and lookup",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFSCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFSCAN_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Extract and print metadata of local PDF files.
    Inspect(InspectArgs),
    /// Print the content identifier of local files.
    Hash(HashArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "PDFSCAN_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// SQLite database file. In-memory store when omitted.
    #[arg(long, env = "PDFSCAN_DATABASE")]
    database: Option<PathBuf>,

    /// Maximum concurrent extractions.
    #[arg(short, long, env = "PDFSCAN_WORKERS", default_value_t = 4)]
    workers: usize,

    /// Identifier encoding.
    #[arg(long, env = "PDFSCAN_ENCODING", value_enum, default_value = "base64")]
    encoding: EncodingArg,

    /// Do not re-extract documents whose identifier is already stored.
    #[arg(long, env = "PDFSCAN_SKIP_DUPLICATES")]
    skip_duplicates: bool,

    /// Per-document extraction limit in seconds (unbounded when omitted).
    #[arg(long, env = "PDFSCAN_EXTRACTION_TIMEOUT",
          value_parser = clap::value_parser!(u64).range(1..))]
    extraction_timeout: Option<u64>,

    /// Largest accepted upload in MiB.
    #[arg(long, env = "PDFSCAN_MAX_UPLOAD_MB", default_value_t = 64)]
    max_upload_mb: usize,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// PDF files to read.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Print records as JSON.
    #[arg(long)]
    json: bool,

    /// Identifier encoding.
    #[arg(long, env = "PDFSCAN_ENCODING", value_enum, default_value = "base64")]
    encoding: EncodingArg,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args, Debug)]
struct HashArgs {
    /// Files to hash.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Identifier encoding.
    #[arg(long, env = "PDFSCAN_ENCODING", value_enum, default_value = "base64")]
    encoding: EncodingArg,
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// Metadata extraction backend.
    #[arg(long, env = "PDFSCAN_ENGINE", value_enum, default_value = "lopdf")]
    engine: EngineArg,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EncodingArg {
    Base64,
    Hex,
}

impl From<EncodingArg> for IdentifierEncoding {
    fn from(v: EncodingArg) -> Self {
        match v {
            EncodingArg::Base64 => IdentifierEncoding::Base64,
            EncodingArg::Hex => IdentifierEncoding::Hex,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EngineArg {
    Lopdf,
    #[cfg(feature = "pdfium")]
    Pdfium,
}

impl EngineArgs {
    fn build(&self) -> Result<Arc<dyn MetadataExtractor>> {
        match self.engine {
            EngineArg::Lopdf => Ok(Arc::new(LopdfExtractor::new())),
            #[cfg(feature = "pdfium")]
            EngineArg::Pdfium => Ok(Arc::new(
                pdf_metadata_scanner::PdfiumExtractor::bind()
                    .context("Failed to initialise the pdfium engine")?,
            )),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Inspect(args) => inspect(args, cli.quiet).await,
        Command::Hash(args) => hash(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let mut builder = ScannerConfig::builder()
        .workers(args.workers)
        .identifier_encoding(args.encoding.into())
        .reextract_duplicates(!args.skip_duplicates);
    if let Some(secs) = args.extraction_timeout {
        builder = builder.extraction_timeout(Duration::from_secs(secs));
    }
    let config = builder.build().context("Invalid configuration")?;

    let store = open_store(args.database.as_ref())?;
    let extractor = args.engine.build()?;
    let pipeline = IngestionPipeline::new(config, extractor, Arc::clone(&store))
        .context("Failed to start ingestion pipeline")?;

    let state = AppState {
        pipeline: Arc::new(pipeline),
        lookup: LookupService::new(store),
    };
    let server_config = ServerConfig {
        bind: args.bind,
        max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
    };

    server::serve(state, &server_config, shutdown_signal())
        .await
        .with_context(|| format!("HTTP server on {} failed", server_config.bind))
}

#[cfg(feature = "sqlite")]
fn open_store(database: Option<&PathBuf>) -> Result<Arc<dyn MetadataStore>> {
    match database {
        Some(path) => Ok(Arc::new(
            pdf_metadata_scanner::SqliteMetadataStore::open(path)
                .with_context(|| format!("Failed to open database {}", path.display()))?,
        )),
        None => {
            info!("No --database given; metadata is kept in memory only");
            Ok(Arc::new(MemoryMetadataStore::new()))
        }
    }
}

#[cfg(not(feature = "sqlite"))]
fn open_store(database: Option<&PathBuf>) -> Result<Arc<dyn MetadataStore>> {
    if database.is_some() {
        anyhow::bail!("--database requires the `sqlite` feature");
    }
    Ok(Arc::new(MemoryMetadataStore::new()))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}

async fn inspect(args: InspectArgs, quiet: bool) -> Result<()> {
    let extractor = args.engine.build()?;
    let hasher = Sha256Hasher::new(args.encoding.into());
    let mut failures = 0usize;

    for path in &args.files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let id = hasher.digest(&bytes);

        let meta = match extract::run_blocking(Arc::clone(&extractor), bytes.into(), None).await {
            Ok(meta) => meta,
            Err(e) => {
                failures += 1;
                eprintln!("{} {}  {}", red("✗"), path.display(), red(&e.to_string()));
                continue;
            }
        };

        if args.json {
            let value = serde_json::json!({
                "file": path.display().to_string(),
                "sha256": id,
                "metadata": meta,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&value).context("Failed to serialize metadata")?
            );
        } else {
            println!("{} {}", green("✓"), bold(&path.display().to_string()));
            println!("  Identifier:   {}", id);
            println!(
                "  PDF Version:  {}",
                meta.pdf_version.as_deref().unwrap_or("-")
            );
            println!("  Producer:     {}", meta.producer.as_deref().unwrap_or("-"));
            println!("  Author:       {}", meta.author.as_deref().unwrap_or("-"));
            println!(
                "  Created:      {}",
                meta.created.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".into())
            );
            println!(
                "  Modified:     {}",
                meta.modified.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".into())
            );
        }
    }

    if failures > 0 {
        if !quiet {
            eprintln!(
                "{}",
                dim(&format!("{}/{} files failed", failures, args.files.len()))
            );
        }
        anyhow::bail!("{} file(s) could not be read as PDF", failures);
    }
    Ok(())
}

async fn hash(args: HashArgs) -> Result<()> {
    let hasher = Sha256Hasher::new(args.encoding.into());
    for path in &args.files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        println!("{}  {}", hasher.digest(&bytes), path.display());
    }
    Ok(())
}
