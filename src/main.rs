//! Manifiesto - waste manifest reporting and document generation
//!
//! A CLI tool that aggregates waste reception manifests and landfill
//! tickets into dashboards and reports, and composes their PDF documents.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, store access, missing record, etc.)
//!   2 - Ticket completed but its document could not be published

mod analysis;
mod cli;
mod config;
mod document;
mod models;
mod report;
mod store;
mod workflow;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use cli::{Args, Command, OutputFormat, SignatureArg};
use config::{Config, CONFIG_FILE};
use document::{
    compose_manifest, compose_ticket, AssetLoader, ComposedDocument, DocumentContext,
    ImageSource, ManifestSignatures,
};
use indicatif::{ProgressBar, ProgressStyle};
use models::DigitizationStatus;
use std::path::{Path, PathBuf};
use store::{
    LocalDirStorage, ObjectStorage, RecordStore, RestObjectStorage, RestStore, SnapshotStore,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use workflow::Publisher;

/// Environment variable holding the hosted store API key.
const API_KEY_ENV: &str = "MANIFIESTO_API_KEY";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("Manifiesto v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .manifiesto.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the store URL, logos, header lines and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so reports printed to stdout stay clean.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("⚠️  Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Ignoring {}: {:#}", CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}

fn api_key() -> Result<String> {
    std::env::var(API_KEY_ENV)
        .with_context(|| format!("{} must be set when using --remote", API_KEY_ENV))
}

/// Open the record store selected by --remote.
fn open_store(args: &Args, config: &Config) -> Result<Box<dyn RecordStore>> {
    if args.remote {
        if config.store.url.is_empty() {
            bail!("No store URL configured; set [store].url or pass --store-url");
        }
        let store = RestStore::new(&config.store, &api_key()?)
            .context("Failed to create record store client")?;
        info!("Using hosted record store at {}", config.store.url);
        Ok(Box::new(store))
    } else {
        let store = SnapshotStore::new(&config.general.snapshot);
        info!("Using snapshot {}", store.path().display());
        Ok(Box::new(store))
    }
}

/// Open the object storage documents are uploaded to.
fn open_storage(args: &Args, config: &Config) -> Result<Box<dyn ObjectStorage>> {
    if args.remote {
        let storage = RestObjectStorage::new(&config.store, &config.storage.bucket, &api_key()?)
            .context("Failed to create object storage client")?;
        Ok(Box::new(storage))
    } else {
        Ok(Box::new(LocalDirStorage::new(&config.general.output_dir)))
    }
}

/// Dispatch a command. Returns the exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let store = open_store(&args, &config)?;
    let ctx = DocumentContext::from_config(&config);
    let loader = AssetLoader::new(config.assets.fetch_timeout_seconds)
        .context("Failed to create image loader")?;

    match args.command.clone() {
        Command::InitConfig => Ok(0),
        Command::Dashboard { format, output } => {
            handle_dashboard(store.as_ref(), &config, format, output.as_deref()).await
        }
        Command::Report {
            from,
            to,
            vessel,
            status,
            format,
            output,
        } => {
            let filter = analysis::ReportFilter {
                from,
                to,
                vessel_id: vessel,
                status,
            };
            handle_report(store.as_ref(), &config, &filter, format, output.as_deref()).await
        }
        Command::ManifestPdf {
            id,
            signatures,
            out_dir,
            upload,
            date,
        } => {
            let record = store
                .manifest(&id)
                .await
                .with_context(|| format!("Failed to load manifest {}", id))?;
            let signatures = signature_parties(&record, &signatures, &ctx);
            let date = date.unwrap_or_else(|| Utc::now().date_naive());

            if upload {
                let storage = open_storage(&args, &config)?;
                let publisher = Publisher {
                    store: store.as_ref(),
                    storage: storage.as_ref(),
                    loader: &loader,
                    ctx: &ctx,
                    paths: &config.storage,
                };
                let published = publisher.publish_manifest(&record, &signatures, date).await?;
                report_missing_images(&published.document);
                println!("✅ Manifest {} published: {}", record.folio, published.url);
            } else {
                let document = compose_manifest(&record, &signatures, &ctx, &loader, date).await;
                save_document(&document, out_dir.as_deref(), &config).await?;
            }
            Ok(0)
        }
        Command::TicketPdf {
            id,
            signature,
            out_dir,
            upload,
            date,
        } => {
            let record = store
                .ticket(&id)
                .await
                .with_context(|| format!("Failed to load landfill ticket {}", id))?;
            let signature = signature.as_deref().map(ImageSource::parse);
            let date = date.unwrap_or_else(|| Utc::now().date_naive());

            if upload {
                let storage = open_storage(&args, &config)?;
                let publisher = Publisher {
                    store: store.as_ref(),
                    storage: storage.as_ref(),
                    loader: &loader,
                    ctx: &ctx,
                    paths: &config.storage,
                };
                let published = publisher
                    .publish_ticket(&record, signature.as_ref(), date)
                    .await?;
                report_missing_images(&published.document);
                println!("✅ Landfill ticket {} published: {}", record.id, published.url);
            } else {
                let document = compose_ticket(&record, signature.as_ref(), &ctx, &loader, date).await;
                save_document(&document, out_dir.as_deref(), &config).await?;
            }
            Ok(0)
        }
        Command::BatchPdf { status, out_dir } => {
            handle_batch_pdf(store.as_ref(), &config, &ctx, &loader, status, out_dir.as_deref(), args.quiet)
                .await
        }
        Command::CompleteTicket {
            id,
            exit_weight,
            observations,
            signature,
        } => {
            let storage = open_storage(&args, &config)?;
            let publisher = Publisher {
                store: store.as_ref(),
                storage: storage.as_ref(),
                loader: &loader,
                ctx: &ctx,
                paths: &config.storage,
            };
            let signature = signature.as_deref().map(ImageSource::parse);

            let outcome = publisher
                .complete_ticket(&id, exit_weight, observations, signature.as_ref(), Utc::now())
                .await?;

            println!("✅ Ticket {} completed.", outcome.ticket.id);
            println!(
                "   Net deposited: {:.2} kg",
                outcome.ticket.net_for_totals()
            );
            match (outcome.document_url, outcome.document_error) {
                (Some(url), _) => {
                    println!("   Document: {}", url);
                    Ok(0)
                }
                (None, error) => {
                    eprintln!(
                        "\n⚠️  The ticket is completed but its document was not published: {}",
                        error.unwrap_or_default()
                    );
                    eprintln!("   Run `manifiesto ticket-pdf --id {} --upload` to retry.", id);
                    Ok(2)
                }
            }
        }
        Command::Vessels => handle_vessels(store.as_ref()).await,
    }
}

/// Build signature parties for a manifest from --signature arguments.
fn signature_parties(
    record: &models::ManifestRecord,
    args: &[SignatureArg],
    ctx: &DocumentContext,
) -> ManifestSignatures {
    let mut signatures = ManifestSignatures::for_record(record, ctx);
    for arg in args {
        match signatures.party_mut(arg.role) {
            Some(party) => party.image = Some(ImageSource::parse(&arg.source)),
            None => warn!("Manifests have no {:?} signature, ignoring it", arg.role),
        }
    }
    signatures
}

fn report_missing_images(document: &ComposedDocument) {
    if document.missing_images > 0 {
        println!(
            "   ⚠️  {} image(s) could not be loaded and were left blank",
            document.missing_images
        );
    }
}

async fn save_document(
    document: &ComposedDocument,
    out_dir: Option<&Path>,
    config: &Config,
) -> Result<PathBuf> {
    let dir = out_dir.map_or_else(|| PathBuf::from(&config.general.output_dir), Path::to_path_buf);
    let path = document
        .save(&dir)
        .await
        .with_context(|| format!("Failed to write {}", document.file_name))?;

    report_missing_images(document);
    println!("✅ {} saved to: {}", document.kind, path.display());
    Ok(path)
}

/// Write output to a file, or print it.
fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("✅ Report saved to: {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

async fn handle_dashboard(
    store: &dyn RecordStore,
    config: &Config,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<i32> {
    let manifests = store.manifests().await.context("Failed to load manifests")?;
    let tickets = if config.report.include_landfill {
        store.tickets().await.context("Failed to load landfill tickets")?
    } else {
        Vec::new()
    };
    info!(
        "Loaded {} manifests and {} tickets",
        manifests.len(),
        tickets.len()
    );

    let dashboard = analysis::build_dashboard(&manifests, &tickets);
    let content = match format {
        OutputFormat::Json => report::generate_json_report(&dashboard)?,
        OutputFormat::Markdown => {
            report::generate_dashboard_markdown(&dashboard, &config.report, Utc::now())
        }
    };

    emit(&content, output)?;
    Ok(0)
}

async fn handle_report(
    store: &dyn RecordStore,
    config: &Config,
    filter: &analysis::ReportFilter,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<i32> {
    let manifests = store.manifests().await.context("Failed to load manifests")?;
    let rows = analysis::detailed_rows(&manifests, filter);
    info!("{} report rows from {} manifests", rows.len(), manifests.len());

    let content = match format {
        OutputFormat::Json => report::generate_json_report(&rows)?,
        OutputFormat::Markdown => report::generate_detailed_markdown(&rows, filter, &config.report),
    };

    emit(&content, output)?;
    Ok(0)
}

async fn handle_batch_pdf(
    store: &dyn RecordStore,
    config: &Config,
    ctx: &DocumentContext,
    loader: &AssetLoader,
    status: Option<DigitizationStatus>,
    out_dir: Option<&Path>,
    quiet: bool,
) -> Result<i32> {
    let manifests: Vec<_> = store
        .manifests()
        .await
        .context("Failed to load manifests")?
        .into_iter()
        .filter(|m| status.map_or(true, |s| m.digitization_status == s))
        .collect();

    if manifests.is_empty() {
        println!("   No manifests to compose.");
        return Ok(0);
    }

    let dir = out_dir.map_or_else(|| PathBuf::from(&config.general.output_dir), Path::to_path_buf);
    let today: NaiveDate = Utc::now().date_naive();

    println!("📄 Composing {} manifests into {}", manifests.len(), dir.display());

    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(manifests.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        pb
    };

    let mut missing = 0;
    for record in &manifests {
        pb.set_message(record.folio.clone());
        let signatures = ManifestSignatures::for_record(record, ctx);
        let document = compose_manifest(record, &signatures, ctx, loader, today).await;
        missing += document.missing_images;
        document
            .save(&dir)
            .await
            .with_context(|| format!("Failed to write {}", document.file_name))?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!("✅ {} manifests saved to: {}", manifests.len(), dir.display());
    if missing > 0 {
        println!("   ⚠️  {} image(s) could not be loaded and were left blank", missing);
    }
    Ok(0)
}

async fn handle_vessels(store: &dyn RecordStore) -> Result<i32> {
    let vessels = store.vessels().await.context("Failed to load vessels")?;
    let pending: Vec<_> = vessels.iter().filter(|v| v.needs_reconciliation()).collect();

    if pending.is_empty() {
        println!("✅ All {} vessels have complete registrations.", vessels.len());
        return Ok(0);
    }

    println!("🚢 {} vessels need their registration completed:\n", pending.len());
    for vessel in pending {
        println!(
            "   {} | {} | {} | {}",
            vessel.id,
            vessel.name,
            vessel.registration.as_deref().unwrap_or("-"),
            vessel.status
        );
    }
    Ok(0)
}
